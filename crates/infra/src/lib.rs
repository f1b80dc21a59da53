//! # Photox Infrastructure
//!
//! Infrastructure implementations of the core ports and the API boundary
//! layer.
//!
//! This crate contains:
//! - The HTTP transport with connection retry
//! - The token store and its storage backends
//! - The authenticated request pipeline and refresh coordinator
//! - Auth, image and community service facades
//! - Image dimension probing, configuration loading, tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `photox-core`
//! - Depends on `photox-domain` and `photox-core`
//! - Contains all "impure" code (network, filesystem, decoding)

pub mod api;
pub mod auth;
pub mod config;
pub mod http;
pub mod media;
pub mod observability;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiError, ApiErrorCategory, ApiRequest, AuthApi, CommunityApi, ErrorEnvelope,
    ImageService, RefreshCoordinator, ValidationError,
};
pub use auth::{FileTokenStorage, MemoryTokenStorage, SessionEvents, TokenStore};
pub use http::HttpClient;
pub use media::DecodingImageProbe;

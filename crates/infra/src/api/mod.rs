//! API boundary layer
//!
//! A single [`ApiClient`] is shared by every service. It attaches the
//! bearer token, classifies failures into [`ApiError`] and hands expired
//! tokens to the [`RefreshCoordinator`], which refreshes once and replays
//! the waiting requests.
//!
//! # Architecture
//!
//! - [`ApiRequest`]: replayable request description
//! - [`ApiClient`]: interceptor pipeline over the retrying `HttpClient`
//! - [`RefreshCoordinator`]: single-flight refresh with FIFO replay
//! - [`AuthApi`], [`ImageService`], [`CommunityApi`]: endpoint facades;
//!   [`ImageService`] runs batch operations through the orchestrator in
//!   `photox-core`

pub mod auth;
pub mod client;
pub mod community;
pub mod errors;
pub mod images;
pub mod refresh;
pub mod request;
pub mod types;

pub use auth::AuthApi;
pub use client::{ApiClient, ApiClientBuilder};
pub use community::CommunityApi;
pub use errors::{ApiError, ApiErrorCategory, ErrorEnvelope, ValidationError};
pub use images::{IdBatch, ImageService, UploadBatch};
pub use refresh::{RefreshCoordinator, RefreshedTokens, Replay, TokenRefresher};
pub use request::{ApiRequest, MultipartBody, RequestBody, RequestKind};
pub use types::{BatchUploadSummary, LikeTarget, ListParams, LoginResponse, Page, UploadResponse};

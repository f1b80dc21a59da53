//! # Photox Core
//!
//! Request-independent logic of the API client - no HTTP code.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for token persistence, session
//!   teardown and image probing
//! - The batch orchestrator with its typed per-item outcomes
//!
//! ## Architecture Principles
//! - Only depends on `photox-domain`
//! - No HTTP, filesystem, or decoding code
//! - All external dependencies via traits

pub mod auth;
pub mod batch;
pub mod media;

// Re-export specific items to avoid ambiguity
pub use auth::ports::{SessionEndReason, SessionObserver, TokenStorage};
pub use batch::{run_sequential, settle_all, BatchProgress, BatchResult, Outcome};
pub use media::ports::ImageProbe;

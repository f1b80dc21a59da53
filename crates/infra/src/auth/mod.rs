//! Token persistence and session lifecycle
//!
//! - [`TokenStore`]: process-wide holder of the access/refresh pair, written
//!   through to a [`TokenStorage`](photox_core::TokenStorage) backend
//! - [`FileTokenStorage`] / [`MemoryTokenStorage`]: storage backends
//! - [`SessionEvents`]: default [`SessionObserver`](photox_core::SessionObserver)
//!   that logs teardown and broadcasts it to subscribers

pub mod session;
pub mod storage;
pub mod token_store;

pub use session::SessionEvents;
pub use storage::{FileTokenStorage, MemoryTokenStorage};
pub use token_store::TokenStore;

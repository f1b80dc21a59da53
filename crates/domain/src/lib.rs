//! # Photox Domain
//!
//! Data types and models shared by the Photox API client.
//!
//! This crate contains:
//! - Token and image data types
//! - Domain error types and Result definitions
//! - Client configuration structures
//! - Domain constants and formatting helpers
//!
//! ## Architecture
//! - No dependencies on other Photox crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::size::format_file_size;

//! Error types used below the API boundary

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Photox infrastructure operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PhotoxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Photox operations
pub type Result<T> = std::result::Result<T, PhotoxError>;

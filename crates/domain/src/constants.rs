//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! client.

// Persisted token storage keys
pub const ACCESS_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

// Client defaults
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Upload validation
pub const IMAGE_MEDIA_PREFIX: &str = "image/";

// Size formatting (base-1024)
pub const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

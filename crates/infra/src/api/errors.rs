//! API-specific error types
//!
//! Classifies failed exchanges by status code and attaches the normalized
//! `{statusCode, data, message}` envelope callers inspect.

use std::time::Duration;

use photox_domain::PhotoxError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::request::RequestKind;

const AUTH_REQUIRED: &str = "authentication required";
const INVALID_CREDENTIALS: &str = "invalid credentials";
const SESSION_EXPIRED: &str = "session expired, please sign in again";
const PAYLOAD_TOO_LARGE: &str = "file too large, please choose under 5MB";
const UNSUPPORTED_MEDIA_TYPE: &str = "unsupported image format";
const SERVER_FAULT: &str = "server error, try later";

/// Normalized error shape handed to callers.
///
/// `status_code` is 0 when no response was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub data: Value,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status_code: u16, data: Value, message: impl Into<String>) -> Self {
        Self { status_code, data, message: message.into() }
    }

    fn local(message: impl Into<String>) -> Self {
        Self::new(0, Value::Null, message)
    }
}

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401 or an unrecoverable session
    Authentication,
    /// Rejected upload (413, 415)
    Upload,
    /// Server faults (5xx)
    Server,
    /// Other non-success statuses
    Client,
    /// Rejected before any request was sent
    Validation,
    /// No response received, or none within the timeout
    Network,
    /// Response or image could not be decoded
    Decode,
    /// Local storage, configuration or internal failures
    Local,
}

/// Pre-network validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please sign in first")]
    NotSignedIn,

    #[error("file {file_name} is not an image")]
    NotAnImage { file_name: String },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("multipart requests must not set an explicit content-type")]
    MultipartContentType,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .envelope.message)]
    Unauthorized {
        envelope: ErrorEnvelope,
        #[source]
        cause: Option<reqwest::Error>,
    },

    #[error("{}", .envelope.message)]
    InvalidCredentials {
        envelope: ErrorEnvelope,
        #[source]
        cause: Option<reqwest::Error>,
    },

    #[error("session expired, please sign in again")]
    SessionExpired {
        #[source]
        cause: Option<Box<ApiError>>,
    },

    #[error("{}", .envelope.message)]
    PayloadTooLarge {
        envelope: ErrorEnvelope,
        #[source]
        cause: Option<reqwest::Error>,
    },

    #[error("{}", .envelope.message)]
    UnsupportedMediaType {
        envelope: ErrorEnvelope,
        #[source]
        cause: Option<reqwest::Error>,
    },

    #[error("{}", .envelope.message)]
    Server {
        envelope: ErrorEnvelope,
        #[source]
        cause: Option<reqwest::Error>,
    },

    #[error("{}", .envelope.message)]
    Client {
        envelope: ErrorEnvelope,
        #[source]
        cause: Option<reqwest::Error>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("could not read dimensions of {file_name}: {message}")]
    Probe { file_name: String, message: String },

    #[error("token storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Classify a non-success response.
    ///
    /// A 401 on the login exchange means bad credentials rather than an
    /// expired token and never reaches the refresh coordinator.
    pub fn from_status(
        status: StatusCode,
        data: Value,
        cause: Option<reqwest::Error>,
        kind: RequestKind,
    ) -> Self {
        let code = status.as_u16();
        let server_message = server_message(&data);

        match status {
            StatusCode::UNAUTHORIZED if kind == RequestKind::Login => Self::InvalidCredentials {
                envelope: ErrorEnvelope::new(code, data, INVALID_CREDENTIALS),
                cause,
            },
            StatusCode::UNAUTHORIZED => {
                let message = server_message.unwrap_or_else(|| AUTH_REQUIRED.to_string());
                Self::Unauthorized { envelope: ErrorEnvelope::new(code, data, message), cause }
            }
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge {
                envelope: ErrorEnvelope::new(code, data, PAYLOAD_TOO_LARGE),
                cause,
            },
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Self::UnsupportedMediaType {
                envelope: ErrorEnvelope::new(code, data, UNSUPPORTED_MEDIA_TYPE),
                cause,
            },
            s if s.is_server_error() => {
                let message = server_message.unwrap_or_else(|| SERVER_FAULT.to_string());
                Self::Server { envelope: ErrorEnvelope::new(code, data, message), cause }
            }
            _ => {
                let message = server_message
                    .unwrap_or_else(|| format!("request failed with status {status}"));
                Self::Client { envelope: ErrorEnvelope::new(code, data, message), cause }
            }
        }
    }

    /// Normalized envelope for this error
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::Unauthorized { envelope, .. }
            | Self::InvalidCredentials { envelope, .. }
            | Self::PayloadTooLarge { envelope, .. }
            | Self::UnsupportedMediaType { envelope, .. }
            | Self::Server { envelope, .. }
            | Self::Client { envelope, .. } => envelope.clone(),
            Self::SessionExpired { cause } => {
                let status_code = cause.as_ref().and_then(|c| c.status_code()).unwrap_or(401);
                ErrorEnvelope::new(status_code, Value::Null, SESSION_EXPIRED)
            }
            other => ErrorEnvelope::local(other.to_string()),
        }
    }

    /// Status code of the response that caused this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { envelope, .. }
            | Self::InvalidCredentials { envelope, .. }
            | Self::PayloadTooLarge { envelope, .. }
            | Self::UnsupportedMediaType { envelope, .. }
            | Self::Server { envelope, .. }
            | Self::Client { envelope, .. } => Some(envelope.status_code),
            Self::SessionExpired { cause } => cause.as_ref().and_then(|c| c.status_code()),
            _ => None,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Unauthorized { .. }
            | Self::InvalidCredentials { .. }
            | Self::SessionExpired { .. } => ApiErrorCategory::Authentication,
            Self::PayloadTooLarge { .. } | Self::UnsupportedMediaType { .. } => {
                ApiErrorCategory::Upload
            }
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } => ApiErrorCategory::Client,
            Self::Validation(_) => ApiErrorCategory::Validation,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Decode(_) | Self::Probe { .. } => ApiErrorCategory::Decode,
            Self::Storage(_) | Self::Config(_) | Self::Internal(_) => ApiErrorCategory::Local,
        }
    }

    /// Whether this is a 401 eligible for token refresh
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<PhotoxError> for ApiError {
    fn from(err: PhotoxError) -> Self {
        match err {
            PhotoxError::Config(message) => Self::Config(message),
            PhotoxError::Storage(message) => Self::Storage(message),
            PhotoxError::Decode(message) => Self::Decode(message),
            PhotoxError::Internal(message) => Self::Internal(message),
        }
    }
}

// Django REST responses carry the reason in `message` or `detail`
fn server_message(data: &Value) -> Option<String> {
    match data {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Object(map) => ["message", "detail", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

//! Wire-level request and response shapes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::ApiError;

/// Response of `POST /images/upload/`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub id: i64,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchUploadResponse {
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a single multi-file upload request.
///
/// The server may answer 207 when only some files were stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUploadSummary {
    pub success: u32,
    pub failed: u32,
    pub total: usize,
    pub results: Vec<Value>,
    pub errors: Vec<Value>,
    pub message: String,
}

impl BatchUploadSummary {
    pub(crate) fn from_response(response: BatchUploadResponse, total: usize) -> Self {
        Self {
            success: response.success_count,
            failed: response.error_count,
            total,
            results: response.results,
            errors: response.errors,
            message: response.message.unwrap_or_else(|| "batch upload complete".to_string()),
        }
    }
}

/// Response of `POST /users/login/`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    /// Remaining fields (user profile and the like)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Query parameters for image listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// e.g. `-created_at`
    pub ordering: Option<String>,
}

impl ListParams {
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("page_size", page_size.to_string()));
        }
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        pairs
    }
}

/// Paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl Page<Value> {
    /// Accept both the wrapped (`{"data": {...}}`) and the bare paginated
    /// shape.
    pub(crate) fn from_payload(payload: Value) -> Result<Self, ApiError> {
        let page = match payload {
            Value::Object(mut map) if map.get("data").is_some_and(|d| !d.is_null()) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            Value::Object(map) if map.contains_key("results") => Value::Object(map),
            _ => return Err(ApiError::Decode("invalid response format".to_string())),
        };
        serde_json::from_value(page)
            .map_err(|err| ApiError::Decode(format!("invalid page: {err}")))
    }
}

/// Target of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Image,
    Comment,
}

impl LikeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Comment => "comment",
        }
    }
}

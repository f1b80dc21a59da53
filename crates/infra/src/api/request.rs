//! Request description consumed by [`ApiClient`](super::ApiClient)
//!
//! Requests are plain data so they can be replayed after a token refresh.

use photox_domain::ImageFile;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;

use super::errors::ValidationError;

/// How the pipeline treats a 401 for this request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestKind {
    /// Regular call; a 401 goes through the refresh coordinator
    #[default]
    Standard,
    /// Credential exchange; a 401 means invalid credentials
    Login,
    /// The refresh exchange itself; a 401 tears the session down
    Refresh,
}

#[derive(Debug, Clone)]
struct FilePart {
    field: String,
    file: ImageFile,
}

/// Multipart form held as data.
///
/// Built into a fresh [`Form`] on every send, since a form is consumed by
/// the transport.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, field: impl Into<String>, file: ImageFile) -> Self {
        self.files.push(FilePart { field: field.into(), file });
        self
    }

    pub(crate) fn to_form(&self) -> Result<Form, ValidationError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for part in &self.files {
            let file = &part.file;
            let body = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.media_type)
                .map_err(|_| ValidationError::NotAnImage { file_name: file.name.clone() })?;
            form = form.part(part.field.clone(), body);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

/// A single API call relative to the configured base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) kind: RequestKind,
}

impl ApiRequest {
    /// `path` is appended to the base URL; an absolute `http(s)://` URL is
    /// used as-is (pagination links).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            kind: RequestKind::Standard,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn kind(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn request_kind(&self) -> RequestKind {
        self.kind
    }

    /// Reject requests that would be malformed on the wire.
    ///
    /// A manual content-type on a multipart body drops the boundary the
    /// transport generates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.body, RequestBody::Multipart(_))
            && self.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        {
            return Err(ValidationError::MultipartContentType);
        }
        Ok(())
    }
}

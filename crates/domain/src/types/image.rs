//! Image upload inputs and display records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::IMAGE_MEDIA_PREFIX;

/// An in-memory file selected for upload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// Declared media type, e.g. `image/png`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), media_type: media_type.into(), bytes }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the declared media type is an image type
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with(IMAGE_MEDIA_PREFIX)
    }

    /// Upper-cased media subtype (`image/png` -> `PNG`)
    pub fn format_tag(&self) -> String {
        self.media_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or(self.media_type.as_str())
            .to_uppercase()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// One file of a titled batch upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub file: ImageFile,
    pub title: String,
}

impl UploadItem {
    pub fn new(file: ImageFile, title: impl Into<String>) -> Self {
        Self { file, title: title.into() }
    }
}

/// Optional form fields sent alongside an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub title: Option<String>,
    pub is_public: Option<bool>,
}

/// Pixel dimensions of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Display-ready record for an uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub thumbnail: String,
    pub url: String,
    /// Human-readable size, see [`crate::format_file_size`]
    pub size: String,
    pub dimensions: Dimensions,
    /// Upper-cased format tag, e.g. `JPEG`
    pub format: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

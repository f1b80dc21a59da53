//! Port interface for image inspection

use async_trait::async_trait;
use photox_domain::{Dimensions, ImageFile, Result};

/// Trait for reading pixel dimensions out of an image file
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Decode enough of `file` to report its width and height
    async fn dimensions(&self, file: &ImageFile) -> Result<Dimensions>;
}

use std::io::Cursor;

use async_trait::async_trait;
use image::ImageReader;
use photox_core::ImageProbe;
use photox_domain::{Dimensions, ImageFile, PhotoxError, Result};
use tracing::debug;

/// Reads dimensions from the image header.
///
/// Decoding runs on the blocking pool; only the header is parsed, so
/// truncated pixel data still yields dimensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodingImageProbe;

impl DecodingImageProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageProbe for DecodingImageProbe {
    async fn dimensions(&self, file: &ImageFile) -> Result<Dimensions> {
        let bytes = file.bytes.clone();
        let name = file.name.clone();

        let (width, height) = tokio::task::spawn_blocking(move || read_dimensions(bytes))
            .await
            .map_err(|err| PhotoxError::Internal(format!("probe task failed: {err}")))?
            .map_err(|err| PhotoxError::Decode(format!("{name}: {err}")))?;

        debug!(file = %file.name, width, height, "Probed image dimensions");
        Ok(Dimensions { width, height })
    }
}

fn read_dimensions(bytes: Vec<u8>) -> image::ImageResult<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes)).with_guessed_format()?.into_dimensions()
}

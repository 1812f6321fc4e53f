use crate::errors::{AppError, AppResult};
use crate::models::ImageFormat;

/// Encoded image bytes plus the format detected from their content
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImageBuffer {
    /// Wrap raw bytes, detecting the format by content inspection
    pub fn from_bytes(bytes: Vec<u8>) -> AppResult<Self> {
        match ImageFormat::detect(&bytes) {
            Some(format) => Ok(Self { bytes, format }),
            None => Err(AppError::unsupported_format(
                image::guess_format(&bytes)
                    .map(|f| format!("{f:?}").to_lowercase())
                    .unwrap_or_else(|_| "unknown".to_string()),
            )),
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

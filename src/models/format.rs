//! Supported image formats and the lookup table shared by the validator and the Blob Store
//!
//! The table is built once at startup and handed out behind an `Arc`; nothing
//! mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Tiff,
}

impl ImageFormat {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Tiff => "image/tiff",
        }
    }

    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Webp => image::ImageFormat::WebP,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Inspect magic bytes; the filename is never trusted for this
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        image::guess_format(bytes)
            .ok()
            .and_then(Self::from_image_format)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the format table
#[derive(Debug, Clone)]
pub struct FormatEntry {
    pub format: ImageFormat,
    pub aliases: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct FormatTable {
    entries: Vec<FormatEntry>,
}

impl FormatTable {
    pub fn new(entries: Vec<FormatEntry>) -> Self {
        Self { entries }
    }

    /// Resolve a user supplied name or file extension (`jpg` -> `jpeg`, `tif` -> `tiff`)
    pub fn lookup(&self, name: &str) -> Option<ImageFormat> {
        let name = name.trim().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.format.as_str() == name || entry.aliases.contains(&name.as_str()))
            .map(|entry| entry.format)
    }

    /// Content type for a filename, based on its extension
    pub fn mime_for_filename(&self, filename: &str) -> Option<&'static str> {
        let (_, extension) = filename.rsplit_once('.')?;
        self.lookup(extension).map(|format| format.mime_type())
    }
}

impl Default for FormatTable {
    fn default() -> Self {
        Self::new(vec![
            FormatEntry {
                format: ImageFormat::Jpeg,
                aliases: &["jpg"],
            },
            FormatEntry {
                format: ImageFormat::Png,
                aliases: &[],
            },
            FormatEntry {
                format: ImageFormat::Webp,
                aliases: &[],
            },
            FormatEntry {
                format: ImageFormat::Tiff,
                aliases: &["tif"],
            },
        ])
    }
}

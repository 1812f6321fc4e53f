//! Image engine capabilities
//!
//! The pipeline talks to two engines through these traits: one for geometry
//! and format work on encoded buffers, one for per-pixel filters on a decoded
//! raster. Keeping them separate keeps the filter stage's independent decode
//! visible and lets tests substitute either side.

use crate::errors::EngineError;
use crate::models::{Dimensions, FilterOps, ImageFormat};

use super::buffer::ImageBuffer;

pub mod raster;
pub mod vector;

pub use raster::RasterFilterEngine;
pub use vector::VectorGeometryEngine;

/// Largest raster, in pixels, an engine will allocate for a resize target
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

/// A single geometry/format request for the vector engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryOp {
    /// Rotation, X/Y mirroring and re-encode quality, applied in one call
    Orient {
        rotate: i32,
        flip: bool,
        mirror: bool,
        quality: i32,
    },
    Resize(Dimensions),
    /// Centre-gravity crop
    Crop(Dimensions),
    Convert(ImageFormat),
}

impl GeometryOp {
    pub fn stage_name(&self) -> &'static str {
        match self {
            GeometryOp::Orient { .. } => "orientation",
            GeometryOp::Resize(_) => "resize",
            GeometryOp::Crop(_) => "crop",
            GeometryOp::Convert(_) => "convert",
        }
    }
}

pub trait GeometryFormatEngine: Send + Sync {
    fn apply(&self, buffer: ImageBuffer, op: &GeometryOp) -> Result<ImageBuffer, EngineError>;
}

pub trait FilterEngine: Send + Sync {
    fn apply(&self, buffer: ImageBuffer, ops: &FilterOps) -> Result<ImageBuffer, EngineError>;
}

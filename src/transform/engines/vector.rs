//! Geometry and format engine backed by the `image` crate

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, warn};

use super::{GeometryFormatEngine, GeometryOp, MAX_OUTPUT_PIXELS};
use crate::errors::EngineError;
use crate::models::{Dimensions, ImageFormat};
use crate::transform::buffer::ImageBuffer;
use crate::transform::codec;

#[derive(Debug, Clone)]
pub struct VectorGeometryEngine {
    /// Quality used by every re-encode that does not carry its own
    default_quality: i32,
}

impl VectorGeometryEngine {
    pub fn new(default_quality: i32) -> Self {
        Self { default_quality }
    }

    fn decode(&self, buffer: &ImageBuffer, stage: &str) -> Result<DynamicImage, EngineError> {
        codec::decode(buffer).map_err(|e| EngineError::new(stage, e))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: i32,
        stage: &str,
    ) -> Result<ImageBuffer, EngineError> {
        let bytes = codec::encode(image, format, quality).map_err(|e| EngineError::new(stage, e))?;
        ImageBuffer::from_bytes(bytes).map_err(|e| EngineError::new(stage, e))
    }

    fn orient(
        &self,
        buffer: ImageBuffer,
        rotate: i32,
        flip: bool,
        mirror: bool,
        quality: i32,
    ) -> Result<ImageBuffer, EngineError> {
        let stage = "orientation";
        let mut image = self.decode(&buffer, stage)?;

        if rotate.rem_euclid(90) != 0 {
            warn!(
                rotate,
                applied = quarter_turns(rotate) * 90,
                "rotation is not a multiple of 90, snapping down"
            );
        }
        image = match quarter_turns(rotate) {
            1 => image.rotate90(),
            2 => image.rotate180(),
            3 => image.rotate270(),
            _ => image,
        };
        if flip {
            image = image.flipv();
        }
        if mirror {
            image = image.fliph();
        }

        self.encode(&image, buffer.format(), quality, stage)
    }

    fn resize(&self, buffer: ImageBuffer, size: Dimensions) -> Result<ImageBuffer, EngineError> {
        let pixels = u64::from(size.width) * u64::from(size.height);
        if pixels > MAX_OUTPUT_PIXELS {
            return Err(EngineError::new(
                "resize",
                format!(
                    "{}x{} exceeds the {MAX_OUTPUT_PIXELS} pixel budget",
                    size.width, size.height
                ),
            ));
        }
        let image = self.decode(&buffer, "resize")?;
        let resized = image.resize_exact(size.width, size.height, FilterType::Lanczos3);
        self.encode(&resized, buffer.format(), self.default_quality, "resize")
    }

    fn crop(&self, buffer: ImageBuffer, size: Dimensions) -> Result<ImageBuffer, EngineError> {
        let image = self.decode(&buffer, "crop")?;
        let (x, y, width, height) = centre_region(image.width(), image.height(), size);
        let cropped = image.crop_imm(x, y, width, height);
        self.encode(&cropped, buffer.format(), self.default_quality, "crop")
    }

    fn convert(&self, buffer: ImageBuffer, target: ImageFormat) -> Result<ImageBuffer, EngineError> {
        if buffer.format() == target {
            return Ok(buffer);
        }
        let image = self.decode(&buffer, "convert")?;
        self.encode(&image, target, self.default_quality, "convert")
    }
}

impl Default for VectorGeometryEngine {
    fn default() -> Self {
        Self::new(crate::config::defaults::DEFAULT_QUALITY)
    }
}

impl GeometryFormatEngine for VectorGeometryEngine {
    fn apply(&self, buffer: ImageBuffer, op: &GeometryOp) -> Result<ImageBuffer, EngineError> {
        debug!(op = ?op, input = ?buffer, "geometry engine call");
        match *op {
            GeometryOp::Orient {
                rotate,
                flip,
                mirror,
                quality,
            } => self.orient(buffer, rotate, flip, mirror, quality),
            GeometryOp::Resize(size) => self.resize(buffer, size),
            GeometryOp::Crop(size) => self.crop(buffer, size),
            GeometryOp::Convert(format) => self.convert(buffer, format),
        }
    }
}

/// Whole clockwise quarter turns for an angle, rounding down within [0, 360)
pub fn quarter_turns(rotate: i32) -> u32 {
    (rotate.rem_euclid(360) / 90) as u32
}

/// Region of the requested size anchored at the image centre, clamped to the image
fn centre_region(image_width: u32, image_height: u32, size: Dimensions) -> (u32, u32, u32, u32) {
    let width = size.width.min(image_width);
    let height = size.height.min(image_height);
    let x = (image_width - width) / 2;
    let y = (image_height - height) / 2;
    (x, y, width, height)
}

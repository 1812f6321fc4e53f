//! Per-pixel filter engine
//!
//! Works on its own decode of the incoming buffer and always re-encodes in the
//! buffer's current format at the engine's default quality.

use image::{DynamicImage, RgbaImage};
use tracing::debug;

use super::FilterEngine;
use crate::errors::EngineError;
use crate::models::FilterOps;
use crate::transform::buffer::ImageBuffer;
use crate::transform::codec;

const STAGE: &str = "filters";

#[derive(Debug, Clone)]
pub struct RasterFilterEngine {
    sepia_percentage: f32,
    default_quality: i32,
}

impl RasterFilterEngine {
    pub fn new(sepia_percentage: f32, default_quality: i32) -> Self {
        Self {
            sepia_percentage,
            default_quality,
        }
    }

    fn run(&self, mut pixels: RgbaImage, ops: &FilterOps) -> RgbaImage {
        if ops.grayscale {
            grayscale(&mut pixels);
        }
        if ops.sepia {
            sepia(&mut pixels, self.sepia_percentage);
        }
        if let Some(gamma) = ops.gamma {
            apply_gamma(&mut pixels, gamma);
        }
        if let Some(sigma) = ops.gaussian_blur {
            pixels = image::imageops::blur(&pixels, sigma);
        }
        pixels
    }
}

impl Default for RasterFilterEngine {
    fn default() -> Self {
        Self::new(
            crate::config::defaults::DEFAULT_SEPIA_PERCENTAGE,
            crate::config::defaults::DEFAULT_QUALITY,
        )
    }
}

impl FilterEngine for RasterFilterEngine {
    fn apply(&self, buffer: ImageBuffer, ops: &FilterOps) -> Result<ImageBuffer, EngineError> {
        debug!(ops = ?ops, input = ?buffer, "filter engine call");

        let decoded = codec::decode(&buffer).map_err(|e| EngineError::new(STAGE, e))?;
        let had_alpha = decoded.color().has_alpha();
        let filtered = DynamicImage::ImageRgba8(self.run(decoded.to_rgba8(), ops));
        let filtered = if had_alpha {
            filtered
        } else {
            DynamicImage::ImageRgb8(filtered.to_rgb8())
        };

        let bytes = codec::encode(&filtered, buffer.format(), self.default_quality)
            .map_err(|e| EngineError::new(STAGE, e))?;
        ImageBuffer::from_bytes(bytes).map_err(|e| EngineError::new(STAGE, e))
    }
}

fn clamp_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Rec. 601 luma
fn grayscale(pixels: &mut RgbaImage) {
    for p in pixels.pixels_mut() {
        let [r, g, b, _] = p.0;
        let y = clamp_channel(0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b));
        p.0[0] = y;
        p.0[1] = y;
        p.0[2] = y;
    }
}

/// Sepia tone blended towards the full matrix by `percentage` (0..=100)
fn sepia(pixels: &mut RgbaImage, percentage: f32) {
    let pct = percentage.clamp(0.0, 100.0) / 100.0;
    let m = [
        [1.0 - 0.607 * pct, 0.769 * pct, 0.189 * pct],
        [0.349 * pct, 1.0 - 0.314 * pct, 0.168 * pct],
        [0.272 * pct, 0.534 * pct, 1.0 - 0.869 * pct],
    ];
    for p in pixels.pixels_mut() {
        let [r, g, b, _] = p.0;
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        for (c, row) in m.iter().enumerate() {
            p.0[c] = clamp_channel(row[0] * r + row[1] * g + row[2] * b);
        }
    }
}

fn apply_gamma(pixels: &mut RgbaImage, gamma: f32) {
    let exponent = 1.0 / gamma.max(1.0e-5);
    let lut: Vec<u8> = (0..=255u16)
        .map(|i| clamp_channel((f32::from(i) / 255.0).powf(exponent) * 255.0))
        .collect();
    for p in pixels.pixels_mut() {
        for c in 0..3 {
            p.0[c] = lut[usize::from(p.0[c])];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageFormat;
    use crate::transform::codec::test_images;
    use image::{GenericImageView, Rgba};

    fn pixel(r: u8, g: u8, b: u8) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba([r, g, b, 255]))
    }

    #[test]
    fn test_grayscale_equalises_channels() {
        let mut img = pixel(200, 100, 50);
        grayscale(&mut img);
        let [r, g, b, a] = img.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 124);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_sepia_zero_percent_is_identity() {
        let mut img = pixel(10, 120, 240);
        sepia(&mut img, 0.0);
        assert_eq!(img.get_pixel(0, 0).0, [10, 120, 240, 255]);
    }

    #[test]
    fn test_sepia_warms_grey() {
        let mut img = pixel(100, 100, 100);
        sepia(&mut img, 50.0);
        let [r, g, b, _] = img.get_pixel(0, 0).0;
        assert!(r > g && g > b, "expected warm tint, got {r},{g},{b}");
    }

    #[test]
    fn test_gamma_one_is_identity_and_above_one_brightens() {
        let mut same = pixel(64, 128, 192);
        apply_gamma(&mut same, 1.0);
        assert_eq!(same.get_pixel(0, 0).0, [64, 128, 192, 255]);

        let mut bright = pixel(64, 128, 192);
        apply_gamma(&mut bright, 2.2);
        let [r, g, b, _] = bright.get_pixel(0, 0).0;
        assert!(r > 64 && g > 128 && b > 192);
    }

    #[test]
    fn test_apply_keeps_format_and_dimensions() {
        let engine = RasterFilterEngine::default();
        let input = test_images::buffer(24, 16, ImageFormat::Png);
        let ops = FilterOps {
            grayscale: true,
            sepia: true,
            gamma: Some(1.5),
            gaussian_blur: Some(1.0),
        };

        let out = engine.apply(input, &ops).unwrap();
        assert_eq!(out.format(), ImageFormat::Png);
        let decoded = codec::decode(&out).unwrap();
        assert_eq!(decoded.dimensions(), (24, 16));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_grayscale_through_lossless_format() {
        let engine = RasterFilterEngine::default();
        let input = test_images::buffer(8, 8, ImageFormat::Webp);
        let ops = FilterOps {
            grayscale: true,
            ..Default::default()
        };

        let out = engine.apply(input, &ops).unwrap();
        let rgb = codec::decode(&out).unwrap().to_rgb8();
        assert!(rgb.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }
}

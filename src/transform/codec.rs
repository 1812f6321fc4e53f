//! Decode/encode helpers shared by both engines

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageResult};
use std::io::Cursor;

use super::buffer::ImageBuffer;
use crate::models::ImageFormat;

/// Decode a buffer into a raster using its detected format
pub fn decode(buffer: &ImageBuffer) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(buffer.bytes(), buffer.format().to_image_format())
}

/// Map a requested quality onto the encoder's 1..=100 argument.
///
/// The validator passes values above 100 through untouched; this is the only
/// place they are bounded.
pub fn encoder_quality(quality: i32) -> u8 {
    quality.clamp(1, 100) as u8
}

/// Encode a raster as `format`. Quality only affects lossy formats (JPEG).
pub fn encode(image: &DynamicImage, format: ImageFormat, quality: i32) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut out,
                encoder_quality(quality),
            ))?;
        }
        ImageFormat::Png => {
            normalize_8bit(image).write_with_encoder(PngEncoder::new(&mut out))?;
        }
        ImageFormat::Webp => {
            normalize_8bit(image).write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        }
        ImageFormat::Tiff => {
            let mut cursor = Cursor::new(&mut out);
            normalize_8bit(image).write_with_encoder(TiffEncoder::new(&mut cursor))?;
        }
    }
    Ok(out)
}

fn normalize_8bit(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}


#[cfg(test)]
mod tests {
    use super::test_images::gradient;
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_encode_produces_requested_format() {
        let img = gradient(16, 8);
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp, ImageFormat::Tiff] {
            let bytes = encode(&img, format, 75).unwrap();
            let buffer = ImageBuffer::from_bytes(bytes).unwrap();
            assert_eq!(buffer.format(), format);

            let decoded = decode(&buffer).unwrap();
            assert_eq!(decoded.dimensions(), (16, 8));
        }
    }

    #[test]
    fn test_lower_jpeg_quality_is_not_larger() {
        let img = gradient(64, 64);
        let low = encode(&img, ImageFormat::Jpeg, 40).unwrap();
        let default = encode(&img, ImageFormat::Jpeg, 75).unwrap();
        assert!(low.len() <= default.len());
    }

    #[test]
    fn test_encoder_quality_bounds() {
        assert_eq!(encoder_quality(-3), 1);
        assert_eq!(encoder_quality(75), 75);
        assert_eq!(encoder_quality(150), 100);
        assert_eq!(encoder_quality(100), 100);
    }
}

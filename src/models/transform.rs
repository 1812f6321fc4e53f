//! Transformation request wire shape and its canonical, validated form

use serde::{Deserialize, Serialize};

use super::format::ImageFormat;

/// Body of `POST /images/{id}/transform`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub transformations: Transformations,
}

/// Raw, user supplied operations. Zero/empty means "not requested".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transformations {
    pub resize: ResizeParams,
    pub crop: CropParams,
    /// Mirror about the Y axis
    pub mirror: bool,
    /// Mirror about the X axis
    pub flip: bool,
    pub rotate: i32,
    pub quality: i32,
    pub format: String,
    pub filters: FilterParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeParams {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParams {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub grayscale: bool,
    pub sepia: bool,
    pub gamma: f32,
    pub gaussian_blur: f32,
}

/// A width/height pair where both sides are positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Only a fully specified, positive pair yields dimensions
    pub fn from_pair(width: i32, height: i32) -> Option<Self> {
        if width > 0 && height > 0 {
            Some(Self {
                width: width as u32,
                height: height as u32,
            })
        } else {
            None
        }
    }
}

/// Upper bounds on request values that drive allocation size or CPU time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformLimits {
    /// Largest width or height accepted for resize and crop
    pub max_dimension: u32,
    pub max_blur_sigma: f32,
}

impl Default for TransformLimits {
    fn default() -> Self {
        Self {
            max_dimension: crate::config::defaults::DEFAULT_MAX_DIMENSION,
            max_blur_sigma: crate::config::defaults::DEFAULT_MAX_BLUR_SIGMA,
        }
    }
}

/// Pixel filters, applied by the raster engine in declaration order
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FilterOps {
    pub grayscale: bool,
    pub sepia: bool,
    pub gamma: Option<f32>,
    pub gaussian_blur: Option<f32>,
}

impl FilterOps {
    pub fn is_empty(&self) -> bool {
        !self.grayscale && !self.sepia && self.gamma.is_none() && self.gaussian_blur.is_none()
    }
}

/// Canonical transformation spec produced by the validator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformSpec {
    pub resize: Option<Dimensions>,
    pub crop: Option<Dimensions>,
    pub mirror: bool,
    pub flip: bool,
    /// Degrees clockwise, passed through as requested
    pub rotate: i32,
    /// Effective encoder quality; values above 100 are left for the engine to handle
    pub quality: i32,
    /// `None` keeps the current format
    pub target_format: Option<ImageFormat>,
    pub filters: FilterOps,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_accepts_partial_payloads() {
        let request: TransformRequest = serde_json::from_value(json!({
            "transformations": {
                "rotate": 90,
                "format": "webp",
                "filters": {"grayscale": true}
            }
        }))
        .unwrap();

        let t = &request.transformations;
        assert_eq!(t.rotate, 90);
        assert_eq!(t.format, "webp");
        assert!(t.filters.grayscale);
        assert_eq!(t.resize, ResizeParams::default());
        assert_eq!(t.quality, 0);
    }

    #[test]
    fn test_gaussian_blur_uses_snake_case_key() {
        let request: TransformRequest = serde_json::from_value(json!({
            "transformations": {"filters": {"gaussian_blur": 1.5, "gamma": 2.2}}
        }))
        .unwrap();
        assert_eq!(request.transformations.filters.gaussian_blur, 1.5);
        assert_eq!(request.transformations.filters.gamma, 2.2);
    }

    #[test]
    fn test_dimensions_require_both_sides() {
        assert_eq!(Dimensions::from_pair(0, 10), None);
        assert_eq!(Dimensions::from_pair(10, -1), None);
        assert_eq!(
            Dimensions::from_pair(10, 20),
            Some(Dimensions {
                width: 10,
                height: 20
            })
        );
    }
}

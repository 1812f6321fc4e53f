use std::sync::Arc;

use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Dimensions, FilterOps, FormatTable, TransformLimits, TransformSpec, Transformations,
};

/// Normalizes raw transformation requests into a [`TransformSpec`]
#[derive(Debug, Clone)]
pub struct TransformValidator {
    formats: Arc<FormatTable>,
    default_quality: i32,
    limits: TransformLimits,
}

impl TransformValidator {
    pub fn new(formats: Arc<FormatTable>, default_quality: i32) -> Self {
        Self {
            formats,
            default_quality,
            limits: TransformLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: TransformLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn validate(&self, raw: &Transformations) -> AppResult<TransformSpec> {
        let target_format = match raw.format.trim() {
            "" => None,
            name => Some(
                self.formats
                    .lookup(name)
                    .ok_or_else(|| AppError::unsupported_format(name.to_ascii_lowercase()))?,
            ),
        };

        let quality = if raw.quality <= 0 {
            self.default_quality
        } else {
            raw.quality
        };

        let filters = FilterOps {
            grayscale: raw.filters.grayscale,
            sepia: raw.filters.sepia,
            gamma: positive(raw.filters.gamma),
            gaussian_blur: positive(raw.filters.gaussian_blur),
        };

        if filters
            .gaussian_blur
            .is_some_and(|sigma| sigma > self.limits.max_blur_sigma)
        {
            return Err(AppError::validation(format!(
                "gaussian_blur must not exceed {}",
                self.limits.max_blur_sigma
            )));
        }

        let resize = Dimensions::from_pair(raw.resize.width, raw.resize.height);
        let crop = Dimensions::from_pair(raw.crop.width, raw.crop.height);
        self.check_dimensions("resize", resize)?;
        self.check_dimensions("crop", crop)?;

        let spec = TransformSpec {
            resize,
            crop,
            mirror: raw.mirror,
            flip: raw.flip,
            rotate: raw.rotate,
            quality,
            target_format,
            filters,
        };
        debug!(spec = ?spec, "validated transform spec");
        Ok(spec)
    }

    fn check_dimensions(&self, field: &str, size: Option<Dimensions>) -> AppResult<()> {
        let max = self.limits.max_dimension;
        match size {
            Some(size) if size.width > max || size.height > max => Err(AppError::validation(
                format!("{field} width and height must not exceed {max}"),
            )),
            _ => Ok(()),
        }
    }
}

fn positive(value: f32) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value)
}

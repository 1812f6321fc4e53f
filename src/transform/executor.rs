//! Fixed-order transform pipeline
//!
//! Drives a validated [`TransformSpec`] through the geometry engine (stages
//! 1-4) and the filter engine (stage 5). The pipeline is synchronous and CPU
//! bound; callers run it on a blocking thread.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use super::buffer::ImageBuffer;
use super::engines::{FilterEngine, GeometryFormatEngine, GeometryOp};
use crate::errors::{AppError, AppResult};
use crate::models::TransformSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Orientation,
    Resize,
    Crop,
    Convert,
    Filters,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Orientation => "orientation",
            PipelineStage::Resize => "resize",
            PipelineStage::Crop => "crop",
            PipelineStage::Convert => "convert",
            PipelineStage::Filters => "filters",
        }
    }
}

/// The stages a spec will run, in execution order
pub fn planned_stages(spec: &TransformSpec) -> Vec<PipelineStage> {
    let mut stages = vec![PipelineStage::Orientation];
    if spec.resize.is_some() {
        stages.push(PipelineStage::Resize);
    }
    if spec.crop.is_some() {
        stages.push(PipelineStage::Crop);
    }
    if spec.target_format.is_some() {
        stages.push(PipelineStage::Convert);
    }
    if !spec.filters.is_empty() {
        stages.push(PipelineStage::Filters);
    }
    stages
}

#[derive(Clone)]
pub struct TransformPipeline {
    geometry: Arc<dyn GeometryFormatEngine>,
    filters: Arc<dyn FilterEngine>,
}

impl TransformPipeline {
    pub fn new(geometry: Arc<dyn GeometryFormatEngine>, filters: Arc<dyn FilterEngine>) -> Self {
        Self { geometry, filters }
    }

    /// Run every requested stage, feeding each stage the previous output.
    ///
    /// Any stage failure aborts the run; the partially transformed buffer is
    /// dropped with it.
    pub fn execute(&self, input: ImageBuffer, spec: &TransformSpec) -> AppResult<ImageBuffer> {
        let started = Instant::now();
        let input_format = input.format();
        let mut buffer = input;

        for stage in planned_stages(spec) {
            let stage_started = Instant::now();
            buffer = self.run_stage(stage, buffer, spec).inspect_err(|e| {
                error!(stage = stage.as_str(), error = %e, "transform stage failed");
            })?;
            debug!(
                stage = stage.as_str(),
                format = %buffer.format(),
                bytes = buffer.len(),
                duration_ms = stage_started.elapsed().as_millis(),
                "transform stage complete"
            );
        }

        debug!(
            input_format = %input_format,
            output_format = %buffer.format(),
            duration_ms = started.elapsed().as_millis(),
            "transform pipeline complete"
        );
        Ok(buffer)
    }

    fn run_stage(
        &self,
        stage: PipelineStage,
        buffer: ImageBuffer,
        spec: &TransformSpec,
    ) -> AppResult<ImageBuffer> {
        let out = match stage {
            PipelineStage::Orientation => self.geometry.apply(
                buffer,
                &GeometryOp::Orient {
                    rotate: spec.rotate,
                    flip: spec.flip,
                    mirror: spec.mirror,
                    quality: spec.quality,
                },
            )?,
            PipelineStage::Resize => match spec.resize {
                Some(size) => self.geometry.apply(buffer, &GeometryOp::Resize(size))?,
                None => buffer,
            },
            PipelineStage::Crop => match spec.crop {
                Some(size) => self.geometry.apply(buffer, &GeometryOp::Crop(size))?,
                None => buffer,
            },
            PipelineStage::Convert => match spec.target_format {
                Some(target) => {
                    let converted = self.geometry.apply(buffer, &GeometryOp::Convert(target))?;
                    // Re-detect from content; the engine's own claim is not trusted
                    let detected = ImageBuffer::from_bytes(converted.into_bytes())
                        .map_err(|e| conversion_mismatch(target.as_str(), &e))?;
                    if detected.format() != target {
                        return Err(AppError::ConversionMismatch {
                            expected: target.to_string(),
                            actual: detected.format().to_string(),
                        });
                    }
                    detected
                }
                None => buffer,
            },
            PipelineStage::Filters => self.filters.apply(buffer, &spec.filters)?,
        };
        Ok(out)
    }
}

fn conversion_mismatch(expected: &str, err: &AppError) -> AppError {
    let actual = match err {
        AppError::UnsupportedFormat { format } => format.clone(),
        other => other.to_string(),
    };
    AppError::ConversionMismatch {
        expected: expected.to_string(),
        actual,
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline").finish_non_exhaustive()
    }
}

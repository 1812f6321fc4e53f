//! Bounded execution of the CPU-bound transform pipeline

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::errors::{AppError, AppResult};
use crate::models::TransformSpec;
use crate::transform::{ImageBuffer, TransformPipeline};

/// Runs pipelines on the blocking thread pool, at most `permits` at a time
#[derive(Debug, Clone)]
pub struct TransformWorkerPool {
    pipeline: TransformPipeline,
    permits: Arc<Semaphore>,
    size: usize,
}

impl TransformWorkerPool {
    pub fn new(pipeline: TransformPipeline, size: usize) -> Self {
        let size = size.max(1);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run(&self, input: ImageBuffer, spec: TransformSpec) -> AppResult<ImageBuffer> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::internal("transform worker pool closed"))?;
        debug!(available = self.permits.available_permits(), "transform worker acquired");

        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.execute(input, &spec)
        })
        .await
        .map_err(|e| {
            error!(error = %e, "transform worker panicked or was cancelled");
            AppError::internal(format!("transform worker failed: {e}"))
        })?
    }
}

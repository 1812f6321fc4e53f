//! Service layer: cache-aside reads, per-image leases, the transform worker
//! pool and the image workflows built on top of them.

pub mod image_service;
pub mod leases;
pub mod resolver;
pub mod worker_pool;

pub use image_service::ImageService;
pub use leases::{ImageLease, ImageLeases};
pub use resolver::CacheAsideResolver;
pub use worker_pool::TransformWorkerPool;

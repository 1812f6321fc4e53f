//! Domain models shared across the stores, the transform pipeline and the web layer

pub mod context;
pub mod format;
pub mod record;
pub mod transform;

pub use context::RequestContext;
pub use format::{FormatEntry, FormatTable, ImageFormat};
pub use record::{ImageRecord, NewImageRecord, Pagination};
pub use transform::{
    CropParams, Dimensions, FilterOps, FilterParams, ResizeParams, TransformLimits,
    TransformRequest, TransformSpec, Transformations,
};

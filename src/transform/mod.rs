//! Image transformation: request validation, the two image engines and the
//! fixed-order pipeline that drives them.
//!
//! # Stages
//!
//! 1. orientation + quality (geometry engine)
//! 2. resize (geometry engine)
//! 3. centre crop (geometry engine)
//! 4. format conversion (geometry engine, output format re-checked)
//! 5. pixel filters (raster engine, independent decode)
//!
//! Every stage consumes the previous stage's buffer. A failing stage aborts
//! the run and nothing partial is returned.

pub mod buffer;
pub mod codec;
pub mod engines;
pub mod executor;
pub mod validator;

pub use buffer::ImageBuffer;
pub use engines::{FilterEngine, GeometryFormatEngine, GeometryOp, RasterFilterEngine, VectorGeometryEngine};
pub use executor::{PipelineStage, TransformPipeline};
pub use validator::TransformValidator;

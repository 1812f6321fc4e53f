//! Small shared helpers

pub mod jitter;
pub mod retry;

pub use retry::{RetryConfig, with_retry};

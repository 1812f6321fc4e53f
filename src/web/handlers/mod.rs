//! HTTP request handlers, one module per resource

pub mod blobs;
pub mod health;
pub mod images;

//! SeaORM repository implementations

pub mod image;

pub use image::ImageSeaOrmRepository;

//! SeaORM entities

pub mod images;
pub mod prelude;

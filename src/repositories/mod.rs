//! Repository abstractions over the Metadata Store
//!
//! Services depend on these traits; the SeaORM implementation lives in
//! [`crate::database::repositories`].

pub mod traits;

pub use traits::*;

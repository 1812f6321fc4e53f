//! Owner-scoped image upload and on-demand transformation service
//!
//! Images live in a Blob Store, their metadata in a SeaORM-backed Metadata
//! Store fronted by a TTL cache. Transformations run through a fixed-order
//! pipeline on a bounded worker pool and overwrite the stored image in place.

pub mod cache;
pub mod config;
pub mod database;
pub mod entities;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod transform;
pub mod utils;
pub mod web;

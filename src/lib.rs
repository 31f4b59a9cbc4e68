//! Product catalog service
//!
//! gRPC CRUD over catalog products with soft deletion and atomic stock
//! reduction, backed by sea-orm.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod grpc;
pub mod migrator;
pub mod proto;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::repositories::SeaOrmProductRepository;
use crate::services::ProductService;

/// Build metadata baked in by `build.rs`.
pub const GIT_HASH: &str = env!("GIT_HASH");
pub const BUILD_TIME: &str = env!("BUILD_TIME");

/// Wires the sea-orm repository into the product service.
pub fn product_service(db: Arc<DatabaseConnection>) -> ProductService {
    ProductService::new(Arc::new(SeaOrmProductRepository::new(db)))
}

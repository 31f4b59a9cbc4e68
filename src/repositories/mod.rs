use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::db::DatabaseAccess;

pub mod product_repository;

pub use product_repository::{
    NewProduct, ProductRepository, SeaOrmProductRepository, StockAdjustment,
};

#[cfg(test)]
pub use product_repository::MockProductRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseAccess;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: DatabaseAccess,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db: DatabaseAccess::new(db),
        }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseAccess {
        &self.db
    }
}

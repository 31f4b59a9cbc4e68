#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use product_catalog::{
    auth::ROLE_METADATA_KEY,
    db::{self, DbConfig},
    grpc::ProductGrpcService,
    proto::product::AddProductRequest,
    repositories::{NewProduct, ProductRepository, SeaOrmProductRepository},
    services::ProductService,
};
use sea_orm::DatabaseConnection;
use tonic::Request;

/// Helper harness backed by a fresh in-memory SQLite database.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub repository: Arc<SeaOrmProductRepository>,
    pub service: ProductService,
}

impl TestApp {
    /// Construct a new test application with a migrated, empty catalog.
    pub async fn new() -> Self {
        // A single pooled connection keeps every query on the same in-memory database.
        Self::with_database(DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout: Duration::from_secs(3600),
            ..Default::default()
        })
        .await
    }

    /// Test application against an arbitrary database, migrated on connect.
    pub async fn with_database(cfg: DbConfig) -> Self {
        let pool = db::establish_connection_with_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let repository = Arc::new(SeaOrmProductRepository::new(db.clone()));
        let service = ProductService::new(repository.clone());

        Self {
            db,
            repository,
            service,
        }
    }

    pub fn grpc(&self) -> ProductGrpcService {
        ProductGrpcService::new(self.service.clone())
    }

    /// Inserts a product directly through the repository and returns its id.
    pub async fn seed_product(&self, name: &str, price: f64, stock: i32) -> i64 {
        self.repository
            .create(new_product(name, price, stock))
            .await
            .expect("failed to seed product")
            .id
    }
}

pub fn new_product(name: &str, price: f64, stock: i32) -> NewProduct {
    NewProduct {
        product_name: name.to_string(),
        description: format!("{name} description"),
        image_url: format!("http://img/{}.png", name.to_lowercase()),
        price,
        stock,
        category_name: "Footwear".to_string(),
    }
}

pub fn add_request(name: &str, price: f32, stock: i32) -> AddProductRequest {
    AddProductRequest {
        product_name: name.to_string(),
        description: format!("{name} description"),
        image_url: format!("http://img/{}.png", name.to_lowercase()),
        price,
        stock,
        category_name: "Footwear".to_string(),
    }
}

/// Wraps `message` in a request carrying `role` metadata.
pub fn with_role<T>(message: T, role: &str) -> Request<T> {
    let mut request = Request::new(message);
    request
        .metadata_mut()
        .insert(ROLE_METADATA_KEY, role.parse().expect("valid metadata"));
    request
}

pub fn as_admin<T>(message: T) -> Request<T> {
    with_role(message, "admin")
}

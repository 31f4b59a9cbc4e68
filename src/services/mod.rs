// Catalog service layer
pub mod product_service;

pub use product_service::{parse_product_id, ProductInput, ProductService, StockReductionLine};

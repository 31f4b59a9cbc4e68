use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::debug;

use crate::entities::product::{self, Column, Entity as Product, Model as ProductModel};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Fields of a product that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub product_name: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    pub stock: i32,
    pub category_name: String,
}

/// One line of a stock reduction batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i64,
    pub quantity: i32,
}

/// Persistence gateway for catalog products.
///
/// Lookups only ever see live rows; soft-deleted products behave as if they
/// were never there.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All live products ordered by id.
    async fn find_all_active(&self) -> Result<Vec<ProductModel>, ServiceError>;

    /// The live product with `id`, or `NotFound`.
    async fn find_by_id(&self, id: i64) -> Result<ProductModel, ServiceError>;

    async fn create(&self, product: NewProduct) -> Result<ProductModel, ServiceError>;

    /// Writes every mutable field of `product` back to its live row.
    async fn save(&self, product: ProductModel) -> Result<ProductModel, ServiceError>;

    /// Stamps `deleted_at` on the live row; `NotFound` if it is already gone.
    async fn soft_delete(&self, product: ProductModel) -> Result<(), ServiceError>;

    async fn decrement_stock(&self, adjustments: Vec<StockAdjustment>)
        -> Result<(), ServiceError>;
}

/// sea-orm backed implementation of [`ProductRepository`]
#[derive(Debug, Clone)]
pub struct SeaOrmProductRepository {
    base: BaseRepository,
}

impl SeaOrmProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

fn product_not_found() -> ServiceError {
    ServiceError::NotFound("product not found".to_string())
}

/// Decrements one live product in a single guarded UPDATE.
///
/// The stock check lives in the WHERE clause, so two concurrent reductions
/// cannot both pass it against the same starting value.
async fn decrement_one<C>(db: &C, adjustment: StockAdjustment) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let StockAdjustment {
        product_id,
        quantity,
    } = adjustment;

    let result = Product::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).sub(quantity))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(product_id))
        .filter(product::not_deleted())
        .filter(Column::Stock.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    // Nothing matched: either the product is gone or it has too little stock.
    let exists = Product::find_by_id(product_id)
        .filter(product::not_deleted())
        .one(db)
        .await?
        .is_some();

    if exists {
        Err(ServiceError::InsufficientStock(format!(
            "insufficient stock for product {product_id}"
        )))
    } else {
        Err(product_not_found())
    }
}

#[async_trait]
impl ProductRepository for SeaOrmProductRepository {
    async fn find_all_active(&self) -> Result<Vec<ProductModel>, ServiceError> {
        self.base
            .get_db()
            .execute("product.find_all_active", |db| {
                Product::find()
                    .filter(product::not_deleted())
                    .order_by_asc(Column::Id)
                    .all(db)
            })
            .await
    }

    async fn find_by_id(&self, id: i64) -> Result<ProductModel, ServiceError> {
        self.base
            .get_db()
            .execute("product.find_by_id", |db| {
                Product::find_by_id(id)
                    .filter(product::not_deleted())
                    .one(db)
            })
            .await?
            .ok_or_else(product_not_found)
    }

    async fn create(&self, new: NewProduct) -> Result<ProductModel, ServiceError> {
        let model = product::ActiveModel {
            product_name: Set(new.product_name),
            description: Set(new.description),
            image_url: Set(new.image_url),
            price: Set(new.price),
            stock: Set(new.stock),
            category_name: Set(new.category_name),
            deleted_at: Set(None),
            ..Default::default()
        };

        let created = self
            .base
            .get_db()
            .execute("product.create", move |db| model.insert(db))
            .await?;

        debug!(product_id = created.id, "Inserted product");
        Ok(created)
    }

    async fn save(&self, product: ProductModel) -> Result<ProductModel, ServiceError> {
        let id = product.id;
        let now = Utc::now();
        let changes = product::ActiveModel {
            product_name: Set(product.product_name.clone()),
            description: Set(product.description.clone()),
            image_url: Set(product.image_url.clone()),
            price: Set(product.price),
            stock: Set(product.stock),
            category_name: Set(product.category_name.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        // Keyed on a live row so a concurrent delete is never undone.
        let result = self
            .base
            .get_db()
            .execute("product.save", move |db| {
                Product::update_many()
                    .set(changes)
                    .filter(Column::Id.eq(id))
                    .filter(product::not_deleted())
                    .exec(db)
            })
            .await?;

        if result.rows_affected == 0 {
            return Err(product_not_found());
        }

        Ok(ProductModel {
            updated_at: now,
            ..product
        })
    }

    async fn soft_delete(&self, product: ProductModel) -> Result<(), ServiceError> {
        let id = product.id;
        let now = Utc::now();
        let changes = product::ActiveModel {
            deleted_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = self
            .base
            .get_db()
            .execute("product.soft_delete", move |db| {
                Product::update_many()
                    .set(changes)
                    .filter(Column::Id.eq(id))
                    .filter(product::not_deleted())
                    .exec(db)
            })
            .await?;

        if result.rows_affected == 0 {
            return Err(product_not_found());
        }

        debug!(product_id = id, "Soft-deleted product");
        Ok(())
    }

    async fn decrement_stock(
        &self,
        adjustments: Vec<StockAdjustment>,
    ) -> Result<(), ServiceError> {
        self.base
            .get_db()
            .transaction("product.decrement_stock", move |txn| {
                Box::pin(async move {
                    for adjustment in adjustments {
                        decrement_one(txn, adjustment).await?;
                    }
                    Ok(())
                })
            })
            .await
    }
}

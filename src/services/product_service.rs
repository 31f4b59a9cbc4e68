use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    auth::CallerIdentity,
    entities::product::Model as ProductModel,
    errors::{ResultExt, ServiceError},
    repositories::{NewProduct, ProductRepository, StockAdjustment},
};

/// Mutable product fields as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub product_name: String,
    pub description: String,
    pub image_url: String,
    pub price: f64,
    pub stock: i32,
    pub category_name: String,
}

impl From<ProductInput> for NewProduct {
    fn from(input: ProductInput) -> Self {
        Self {
            product_name: input.product_name,
            description: input.description,
            image_url: input.image_url,
            price: input.price,
            stock: input.stock,
            category_name: input.category_name,
        }
    }
}

impl ProductInput {
    fn apply_to(self, product: &mut ProductModel) {
        product.product_name = self.product_name;
        product.description = self.description;
        product.image_url = self.image_url;
        product.price = self.price;
        product.stock = self.stock;
        product.category_name = self.category_name;
    }
}

/// Unparsed stock reduction line, ids still in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReductionLine {
    pub product_id: String,
    pub quantity: i32,
}

/// Parses a product id received as a decimal string.
pub fn parse_product_id(raw: &str) -> Result<i64, ServiceError> {
    raw.parse::<i64>()
        .map_err(|_| ServiceError::InvalidInput("invalid product ID".to_string()))
}

fn parse_adjustment(line: &StockReductionLine) -> Result<StockAdjustment, ServiceError> {
    let product_id = parse_product_id(&line.product_id)?;
    if line.quantity <= 0 {
        return Err(ServiceError::InvalidInput(
            "quantity must be positive".to_string(),
        ));
    }
    Ok(StockAdjustment {
        product_id,
        quantity: line.quantity,
    })
}

/// Catalog operations: authorization, id validation and store calls.
#[derive(Clone)]
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    /// Lists every live product.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        self.repository
            .find_all_active()
            .await
            .or_store_error("failed to fetch products")
    }

    /// Creates a product. Admin only.
    #[instrument(skip(self, input), fields(product_name = %input.product_name))]
    pub async fn add_product(
        &self,
        caller: &CallerIdentity,
        input: ProductInput,
    ) -> Result<ProductModel, ServiceError> {
        caller.require_admin("add")?;

        let product = self
            .repository
            .create(input.into())
            .await
            .or_store_error("failed to add product")?;

        info!(product_id = product.id, "Product added");
        Ok(product)
    }

    /// Replaces every mutable field of a live product. Admin only.
    #[instrument(skip(self, input))]
    pub async fn edit_product(
        &self,
        caller: &CallerIdentity,
        id: &str,
        input: ProductInput,
    ) -> Result<ProductModel, ServiceError> {
        caller.require_admin("edit")?;
        let id = parse_product_id(id)?;

        let mut product = self
            .repository
            .find_by_id(id)
            .await
            .or_store_error("failed to update product")?;

        input.apply_to(&mut product);

        let product = self
            .repository
            .save(product)
            .await
            .or_store_error("failed to update product")?;

        info!(product_id = id, "Product updated");
        Ok(product)
    }

    /// Soft-deletes a live product. Admin only.
    #[instrument(skip(self))]
    pub async fn delete_product(
        &self,
        caller: &CallerIdentity,
        id: &str,
    ) -> Result<(), ServiceError> {
        caller.require_admin("delete")?;
        let id = parse_product_id(id)?;

        let product = self
            .repository
            .find_by_id(id)
            .await
            .or_store_error("failed to delete product")?;

        self.repository
            .soft_delete(product)
            .await
            .or_store_error("failed to delete product")?;

        info!(product_id = id, "Product deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<ProductModel, ServiceError> {
        let id = parse_product_id(id)?;

        self.repository
            .find_by_id(id)
            .await
            .or_store_error("failed to fetch product")
    }

    /// Decrements stock for every line atomically.
    ///
    /// All lines are validated before the store is touched, so a malformed
    /// line anywhere in the batch leaves the catalog untouched.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reduce_stock(&self, lines: Vec<StockReductionLine>) -> Result<(), ServiceError> {
        let adjustments = lines
            .iter()
            .map(parse_adjustment)
            .collect::<Result<Vec<_>, _>>()?;

        if adjustments.is_empty() {
            return Ok(());
        }

        self.repository
            .decrement_stock(adjustments)
            .await
            .or_store_error("failed to reduce stock")?;

        info!("Stock reduced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::repositories::MockProductRepository;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use mockall::predicate::eq;
    use sea_orm::DbErr;

    fn sample_input() -> ProductInput {
        ProductInput {
            product_name: "Shoe".into(),
            description: "Running shoe".into(),
            image_url: "http://img/shoe.png".into(),
            price: 19.99,
            stock: 5,
            category_name: "Footwear".into(),
        }
    }

    fn stored(id: i64, input: &ProductInput) -> ProductModel {
        let now = Utc::now();
        ProductModel {
            id,
            product_name: input.product_name.clone(),
            description: input.description.clone(),
            image_url: input.image_url.clone(),
            price: input.price,
            stock: input.stock,
            category_name: input.category_name.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn service(repo: MockProductRepository) -> ProductService {
        ProductService::new(Arc::new(repo))
    }

    fn user() -> CallerIdentity {
        CallerIdentity::new(Role::User("user".into()))
    }

    #[tokio::test]
    async fn add_product_requires_admin_and_skips_store() {
        // No expectations: any repository call would panic.
        let svc = service(MockProductRepository::new());

        let err = svc.add_product(&user(), sample_input()).await.unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(msg) if msg == "unauthorized: only admin can add products");

        let err = svc
            .add_product(&CallerIdentity::anonymous(), sample_input())
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(_));
    }

    #[tokio::test]
    async fn add_product_passes_fields_through() {
        let mut repo = MockProductRepository::new();
        let expected: NewProduct = sample_input().into();
        repo.expect_create()
            .with(eq(expected))
            .times(1)
            .returning(|new| {
                Ok(stored(
                    1,
                    &ProductInput {
                        product_name: new.product_name,
                        description: new.description,
                        image_url: new.image_url,
                        price: new.price,
                        stock: new.stock,
                        category_name: new.category_name,
                    },
                ))
            });

        let product = service(repo)
            .add_product(&CallerIdentity::admin(), sample_input())
            .await
            .unwrap();

        assert_eq!(product.id, 1);
        assert_eq!(product.product_name, "Shoe");
    }

    #[tokio::test]
    async fn add_product_store_failure_is_generic() {
        let mut repo = MockProductRepository::new();
        repo.expect_create()
            .returning(|_| Err(ServiceError::db_error("UNIQUE constraint failed")));

        let err = service(repo)
            .add_product(&CallerIdentity::admin(), sample_input())
            .await
            .unwrap_err();

        assert_eq!(err.response_message(), "failed to add product");
    }

    #[tokio::test]
    async fn edit_product_rejects_non_numeric_id_before_lookup() {
        let svc = service(MockProductRepository::new());

        let err = svc
            .edit_product(&CallerIdentity::admin(), "abc", sample_input())
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::InvalidInput(msg) if msg == "invalid product ID");
    }

    #[tokio::test]
    async fn edit_product_checks_role_before_id() {
        let svc = service(MockProductRepository::new());

        let err = svc
            .edit_product(&user(), "abc", sample_input())
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::Unauthorized(msg) if msg.ends_with("edit products"));
    }

    #[tokio::test]
    async fn edit_product_missing_row_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .with(eq(999))
            .returning(|_| Err(ServiceError::NotFound("product not found".into())));

        let err = service(repo)
            .edit_product(&CallerIdentity::admin(), "999", sample_input())
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::NotFound(msg) if msg == "product not found");
    }

    #[tokio::test]
    async fn edit_product_overwrites_all_fields() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .with(eq(7))
            .returning(|id| Ok(stored(id, &sample_input())));
        repo.expect_save()
            .withf(|p| p.id == 7 && p.product_name == "Boot" && p.stock == 1 && p.price == 49.5)
            .times(1)
            .returning(Ok);

        let input = ProductInput {
            product_name: "Boot".into(),
            price: 49.5,
            stock: 1,
            ..sample_input()
        };
        let product = service(repo)
            .edit_product(&CallerIdentity::admin(), "7", input)
            .await
            .unwrap();

        assert_eq!(product.product_name, "Boot");
    }

    #[tokio::test]
    async fn edit_product_save_failure_is_generic() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(stored(id, &sample_input())));
        repo.expect_save()
            .returning(|_| Err(ServiceError::DatabaseError(DbErr::RecordNotUpdated)));

        let err = service(repo)
            .edit_product(&CallerIdentity::admin(), "7", sample_input())
            .await
            .unwrap_err();

        assert_eq!(err.response_message(), "failed to update product");
    }

    #[tokio::test]
    async fn edit_product_deleted_before_save_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(stored(id, &sample_input())));
        repo.expect_save()
            .times(1)
            .returning(|_| Err(ServiceError::NotFound("product not found".into())));

        let err = service(repo)
            .edit_product(&CallerIdentity::admin(), "7", sample_input())
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::NotFound(msg) if msg == "product not found");
    }

    #[tokio::test]
    async fn delete_product_soft_deletes_the_loaded_row() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .with(eq(3))
            .returning(|id| Ok(stored(id, &sample_input())));
        repo.expect_soft_delete()
            .withf(|p| p.id == 3)
            .times(1)
            .returning(|_| Ok(()));

        service(repo)
            .delete_product(&CallerIdentity::admin(), "3")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_product_requires_admin() {
        let err = service(MockProductRepository::new())
            .delete_product(&user(), "3")
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::Unauthorized(msg) if msg == "unauthorized: only admin can delete products");
    }

    #[tokio::test]
    async fn list_products_store_failure_is_generic() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_all_active()
            .returning(|| Err(ServiceError::db_error("connection refused")));

        let err = service(repo).list_products().await.unwrap_err();
        assert_eq!(err.response_message(), "failed to fetch products");
    }

    #[tokio::test]
    async fn get_product_parses_id() {
        let err = service(MockProductRepository::new())
            .get_product("12abc")
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));

        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .with(eq(12))
            .returning(|id| Ok(stored(id, &sample_input())));
        let product = service(repo).get_product("12").await.unwrap();
        assert_eq!(product.id, 12);
    }

    #[tokio::test]
    async fn reduce_stock_validates_every_line_first() {
        let svc = service(MockProductRepository::new());

        let lines = vec![
            StockReductionLine {
                product_id: "1".into(),
                quantity: 2,
            },
            StockReductionLine {
                product_id: "2".into(),
                quantity: 0,
            },
        ];
        let err = svc.reduce_stock(lines).await.unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(msg) if msg == "quantity must be positive");

        let lines = vec![StockReductionLine {
            product_id: "x".into(),
            quantity: 1,
        }];
        let err = svc.reduce_stock(lines).await.unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(msg) if msg == "invalid product ID");
    }

    #[tokio::test]
    async fn reduce_stock_empty_batch_is_noop() {
        service(MockProductRepository::new())
            .reduce_stock(Vec::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reduce_stock_forwards_parsed_adjustments() {
        let mut repo = MockProductRepository::new();
        repo.expect_decrement_stock()
            .with(eq(vec![
                StockAdjustment {
                    product_id: 1,
                    quantity: 2,
                },
                StockAdjustment {
                    product_id: 4,
                    quantity: 1,
                },
            ]))
            .times(1)
            .returning(|_| Ok(()));

        service(repo)
            .reduce_stock(vec![
                StockReductionLine {
                    product_id: "1".into(),
                    quantity: 2,
                },
                StockReductionLine {
                    product_id: "4".into(),
                    quantity: 1,
                },
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reduce_stock_keeps_insufficient_stock_message() {
        let mut repo = MockProductRepository::new();
        repo.expect_decrement_stock().returning(|_| {
            Err(ServiceError::InsufficientStock(
                "insufficient stock for product 1".into(),
            ))
        });

        let err = service(repo)
            .reduce_stock(vec![StockReductionLine {
                product_id: "1".into(),
                quantity: 99,
            }])
            .await
            .unwrap_err();

        assert_eq!(err.response_message(), "insufficient stock for product 1");
    }
}

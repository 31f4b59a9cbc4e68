use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Catalog product row.
///
/// `price` is kept in double precision here; the RPC layer narrows it to
/// `f32` when building responses.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key, assigned by the database
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Display name
    pub product_name: String,

    /// Free-form description
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Image location, stored verbatim
    pub image_url: String,

    pub price: f64,

    /// Units on hand
    pub stock: i32,

    /// Denormalized category label
    pub category_name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker; rows with a value here are logically removed
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }

        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}

impl Model {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Condition selecting rows that have not been soft-deleted.
pub fn not_deleted() -> sea_orm::Condition {
    sea_orm::Condition::all().add(Column::DeletedAt.is_null())
}

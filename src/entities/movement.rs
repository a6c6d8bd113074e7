//! Movement entity - A single append-only stock event.
//!
//! Each movement references a product, carries a `movement_type` of `IN`, `OUT`,
//! `MOVE` or `ADJUST`, a signed quantity and the time it happened. Ordering by
//! `timestamp` (ties broken by `id`) is the canonical history used for forecasting.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Movement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    /// Unique identifier, also the insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the product this movement belongs to
    pub product_id: i64,
    /// One of `"IN"`, `"OUT"`, `"MOVE"`, `"ADJUST"`
    pub movement_type: String,
    /// Quantity moved
    pub quantity: i32,
    /// When the movement happened
    pub timestamp: DateTimeUtc,
}

/// Defines relationships between Movement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each movement belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

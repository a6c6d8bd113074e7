//! Product entity - Represents a stocked item identified by its SKU.
//!
//! Besides descriptive attributes, each product carries its inventory policy
//! (minimum stock, reorder point and supplier lead time). The SKU is the unique
//! business key; the numeric ID never changes once the product is created.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique business key (e.g., `"SKU-1"`)
    #[sea_orm(unique)]
    pub sku: String,
    /// Human-readable product name
    pub name: String,
    /// Optional grouping (e.g., "hardware")
    pub category: Option<String>,
    /// Purchase cost per unit
    pub unit_cost: Option<f64>,
    /// Selling price per unit
    pub selling_price: Option<f64>,
    /// Stock level that should never be undercut
    pub min_stock: i32,
    /// Stock level at which a new order should be placed
    pub reorder_point: i32,
    /// Supplier lead time in days
    pub lead_time_days: i32,
    /// When the product was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product has many stock movements
    #[sea_orm(has_many = "super::movement::Entity")]
    Movements,
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

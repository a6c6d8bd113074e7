//! Audit log entity - One link of the tamper-evident audit chain.
//!
//! `record_hash` is derived from `prev_hash` and `data`; `prev_hash` points at the
//! `record_hash` of the entry inserted immediately before. The first entry has no
//! `prev_hash`. Rows are never updated or deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    /// Unique identifier, defines chain order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Hash of the preceding entry, `None` for the first entry.
    /// Unique so that two writers racing on the same tail cannot both commit; a
    /// partial index created with the schema admits only one `None`.
    #[sea_orm(unique)]
    pub prev_hash: Option<String>,
    /// SHA-256 hex digest of `prev_hash ‖ data`
    pub record_hash: String,
    /// Description of the audited action (e.g., `"movement:3:OUT:5"`)
    #[sea_orm(column_type = "Text")]
    pub data: String,
    /// When the entry was appended
    pub timestamp: DateTimeUtc,
}

/// Audit entries stand alone
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

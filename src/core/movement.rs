//! Movement business logic - Recording and querying stock movements.
//!
//! Movements are append-only. Creating one checks that the product exists before
//! any write, then inserts the movement and its `movement:<id>:<TYPE>:<quantity>`
//! audit entry in one transaction.

use crate::{
    core::{Page, audit, product::product_exists},
    entities::{Movement, movement},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument};

/// Kind of stock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock received
    In,
    /// Stock shipped or consumed; the demand signal
    Out,
    /// Relocation between locations
    Move,
    /// Manual correction, signed
    Adjust,
}

impl MovementType {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Move => "MOVE",
            Self::Adjust => "ADJUST",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "MOVE" => Ok(Self::Move),
            "ADJUST" => Ok(Self::Adjust),
            _ => Err(Error::InvalidMovementType {
                value: value.to_string(),
            }),
        }
    }
}

/// Request to record a movement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMovement {
    /// Product the movement applies to
    pub product_id: i64,
    /// Kind of movement
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Quantity moved
    pub quantity: i32,
    /// When it happened; defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewMovement {
    /// Movement happening now.
    #[must_use]
    pub const fn new(product_id: i64, movement_type: MovementType, quantity: i32) -> Self {
        Self {
            product_id,
            movement_type,
            quantity,
            timestamp: None,
        }
    }

    /// Back-dates the movement.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Optional filters for [`query_movements`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementFilter {
    /// Only this movement type
    pub movement_type: Option<MovementType>,
    /// Only this product
    pub product_id: Option<i64>,
}

/// Builds the audit description for a stored movement.
#[must_use]
pub fn audit_description(movement: &movement::Model) -> String {
    format!(
        "movement:{}:{}:{}",
        movement.id, movement.movement_type, movement.quantity
    )
}

/// Records a movement and appends its audit entry atomically.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist (nothing is written)
/// - The database insert or the audit append fails (nothing is committed)
#[instrument(skip(db))]
pub async fn create_movement(
    db: &DatabaseConnection,
    new_movement: NewMovement,
) -> Result<movement::Model> {
    let _guard = audit::lock_chain().await;
    let txn = db.begin().await?;

    if !product_exists(&txn, new_movement.product_id).await? {
        return Err(Error::ProductNotFound {
            id: new_movement.product_id,
        });
    }

    let model = movement::ActiveModel {
        product_id: Set(new_movement.product_id),
        movement_type: Set(new_movement.movement_type.to_string()),
        quantity: Set(new_movement.quantity),
        timestamp: Set(new_movement.timestamp.unwrap_or_else(Utc::now)),
        ..Default::default()
    };

    let movement = model.insert(&txn).await?;
    audit::append_in(&txn, &audit_description(&movement)).await?;
    txn.commit().await?;

    info!(movement_id = movement.id, "movement recorded");
    Ok(movement)
}

/// Retrieves a movement by ID.
pub async fn get_movement(
    db: &DatabaseConnection,
    movement_id: i64,
) -> Result<Option<movement::Model>> {
    Movement::find_by_id(movement_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists movements in insertion order.
pub async fn list_movements(db: &DatabaseConnection, page: Page) -> Result<Vec<movement::Model>> {
    Movement::find()
        .order_by_asc(movement::Column::Id)
        .offset(page.offset)
        .limit(page.limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns movements matching `filter` in canonical order: timestamp ascending,
/// ties broken by insertion order.
pub async fn query_movements(
    db: &DatabaseConnection,
    filter: MovementFilter,
) -> Result<Vec<movement::Model>> {
    let mut query = Movement::find();

    if let Some(movement_type) = filter.movement_type {
        query = query.filter(movement::Column::MovementType.eq(movement_type.as_str()));
    }
    if let Some(product_id) = filter.product_id {
        query = query.filter(movement::Column::ProductId.eq(product_id));
    }

    query
        .order_by_asc(movement::Column::Timestamp)
        .order_by_asc(movement::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

//! Stock levels - Derives on-hand quantity from the movement history.
//!
//! IN adds, OUT subtracts and ADJUST adds its signed quantity. MOVE relocates stock
//! without changing the total.

use crate::{
    core::{
        movement::{MovementFilter, MovementType, query_movements},
        product::get_product,
    },
    entities::movement,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Stock position of a product against its inventory policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReorderStatus {
    /// Product the status is for
    pub product_id: i64,
    /// Current on-hand quantity
    pub on_hand: i64,
    /// Policy reorder point
    pub reorder_point: i32,
    /// Policy minimum stock
    pub min_stock: i32,
    /// On hand is at or below the reorder point
    pub needs_reorder: bool,
    /// On hand is below the minimum stock
    pub below_minimum: bool,
}

/// Net effect of one movement on the on-hand quantity.
pub fn stock_delta(movement: &movement::Model) -> Result<i64> {
    let quantity = i64::from(movement.quantity);
    Ok(match movement.movement_type.parse::<MovementType>()? {
        MovementType::In | MovementType::Adjust => quantity,
        MovementType::Out => -quantity,
        MovementType::Move => 0,
    })
}

/// Current on-hand quantity of a product.
pub async fn stock_on_hand(db: &DatabaseConnection, product_id: i64) -> Result<i64> {
    let movements = query_movements(
        db,
        MovementFilter {
            movement_type: None,
            product_id: Some(product_id),
        },
    )
    .await?;

    movements
        .iter()
        .try_fold(0_i64, |total, movement| -> Result<i64> {
            Ok(total + stock_delta(movement)?)
        })
}

/// Compares on-hand stock with the product's reorder point and minimum.
///
/// # Errors
/// Returns an error if the product does not exist or the movements cannot be read.
pub async fn reorder_status(db: &DatabaseConnection, product_id: i64) -> Result<ReorderStatus> {
    let product = get_product(db, product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?;
    let on_hand = stock_on_hand(db, product_id).await?;

    Ok(ReorderStatus {
        product_id,
        on_hand,
        reorder_point: product.reorder_point,
        min_stock: product.min_stock,
        needs_reorder: on_hand <= i64::from(product.reorder_point),
        below_minimum: on_hand < i64::from(product.min_stock),
    })
}

//! Movement aggregation - Turns raw movements into per-product demand series.
//!
//! Only OUT movements count as demand. Series are ordered by the canonical movement
//! order (timestamp, then insertion), and the index of each point is used as the
//! time axis by the regression models, so the output must be reproducible for a
//! fixed set of movements.

use crate::{
    core::movement::{MovementFilter, MovementType, query_movements},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use tracing::debug;

/// Collects the OUT quantities of every product, keyed by product ID.
///
/// Products without OUT movements do not appear in the map.
pub async fn gather_histories(db: &DatabaseConnection) -> Result<BTreeMap<i64, Vec<i64>>> {
    let movements = query_movements(
        db,
        MovementFilter {
            movement_type: Some(MovementType::Out),
            product_id: None,
        },
    )
    .await?;

    let mut histories: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for movement in movements {
        histories
            .entry(movement.product_id)
            .or_default()
            .push(i64::from(movement.quantity));
    }

    debug!(products = histories.len(), "gathered demand histories");
    Ok(histories)
}

/// OUT quantities of a single product, in canonical order, as forecast input.
pub async fn history_for_product(db: &DatabaseConnection, product_id: i64) -> Result<Vec<f64>> {
    let movements = query_movements(
        db,
        MovementFilter {
            movement_type: Some(MovementType::Out),
            product_id: Some(product_id),
        },
    )
    .await?;

    Ok(movements
        .iter()
        .map(|movement| f64::from(movement.quantity))
        .collect())
}

//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        movement::{self, MovementType, NewMovement},
        product::{self, NewProduct},
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test product with the given SKU.
///
/// # Defaults
/// * `name`: `"Test Product"`
/// * policy fields: 0
pub async fn create_test_product(
    db: &DatabaseConnection,
    sku: &str,
) -> Result<entities::product::Model> {
    product::create_product(db, NewProduct::new(sku, "Test Product")).await
}

/// Records one OUT movement at a specific time.
pub async fn record_out(
    db: &DatabaseConnection,
    product_id: i64,
    quantity: i32,
    at: DateTime<Utc>,
) -> Result<entities::movement::Model> {
    movement::create_movement(
        db,
        NewMovement::new(product_id, MovementType::Out, quantity).at(at),
    )
    .await
}

/// Records OUT movements in the given order, timestamped now.
/// Equal timestamps fall back to insertion order, so the series keeps this order.
pub async fn record_outs(db: &DatabaseConnection, product_id: i64, quantities: &[i32]) -> Result<()> {
    for quantity in quantities {
        movement::create_movement(
            db,
            NewMovement::new(product_id, MovementType::Out, *quantity),
        )
        .await?;
    }
    Ok(())
}

/// Sets up a test database with one product (`SKU-1`).
/// Returns (db, product) for movement-related tests.
pub async fn setup_with_product() -> Result<(DatabaseConnection, entities::product::Model)> {
    let db = setup_test_db().await?;
    let product = create_test_product(&db, "SKU-1").await?;
    Ok((db, product))
}

/// Stores two raw audit rows so that the next append collides on `prev_hash`.
///
/// The newest row's `record_hash` is already claimed as a `prev_hash` by the row
/// before it, so any further append violates the unique constraint.
pub async fn jam_audit_chain(db: &DatabaseConnection) -> Result<()> {
    for (prev_hash, record_hash) in [("tail", "orphan"), ("orphan-parent", "tail")] {
        entities::audit_log::ActiveModel {
            prev_hash: Set(Some(prev_hash.to_string())),
            record_hash: Set(record_hash.to_string()),
            data: Set("seeded".to_string()),
            timestamp: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

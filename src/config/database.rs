//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Creation is `IF NOT EXISTS`, which makes
//! bootstrapping safe to repeat against an existing database file.

use crate::entities::{AuditLog, Movement, Product, SystemState};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/inventory.sqlite?mode=rwc";

/// At most one audit entry may lack a `prev_hash`. `UNIQUE` alone lets any number of
/// NULLs through, so the genesis entry gets its own partial index.
const SINGLE_GENESIS_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     idx_audit_logs_single_genesis ON audit_logs ((prev_hash IS NULL)) \
     WHERE prev_hash IS NULL";

/// Gets the database URL from environment variable or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables (products, movements, audit log, system state) if they are missing.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_for(db, &schema, Product).await?;
    create_table_for(db, &schema, Movement).await?;
    create_table_for(db, &schema, AuditLog).await?;
    create_table_for(db, &schema, SystemState).await?;
    db.execute_unprepared(SINGLE_GENESIS_INDEX).await?;

    info!("Database schema ready");
    Ok(())
}

/// Connects using `DATABASE_URL` and makes sure the schema exists.
pub async fn init_database() -> Result<DatabaseConnection> {
    let db = create_connection().await?;
    create_tables(&db).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{
        audit_log::{self, Model as AuditLogModel},
        movement::Model as MovementModel,
        product::Model as ProductModel,
        system_state::Model as SystemStateModel,
    };
    use sea_orm::{ActiveModelTrait, QuerySelect, Set, SqlErr};

    fn audit_row(prev_hash: Option<&str>, record_hash: &str) -> audit_log::ActiveModel {
        audit_log::ActiveModel {
            prev_hash: Set(prev_hash.map(str::to_string)),
            record_hash: Set(record_hash.to_string()),
            data: Set("create_product:1".to_string()),
            timestamp: Set(chrono::Utc::now()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        let _: Vec<MovementModel> = Movement::find().limit(1).all(&db).await?;
        let _: Vec<AuditLogModel> = AuditLog::find().limit(1).all(&db).await?;
        let _: Vec<SystemStateModel> = SystemState::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;

        let _: Vec<ProductModel> = Product::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_second_genesis_entry_rejected() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        audit_row(None, "first").insert(&db).await?;
        let err = audit_row(None, "second").insert(&db).await.unwrap_err();
        assert!(matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))));

        // Linked entries are unaffected by the genesis index.
        audit_row(Some("first"), "third").insert(&db).await?;
        assert_eq!(AuditLog::find().all(&db).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_forked_link_rejected() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        audit_row(None, "first").insert(&db).await?;
        audit_row(Some("first"), "second").insert(&db).await?;
        let err = audit_row(Some("first"), "fork").insert(&db).await.unwrap_err();
        assert!(matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))));

        Ok(())
    }
}

//! Product business logic - Creation, lookup and listing of products.
//!
//! Creation validates its input before touching the database, rejects duplicate SKUs,
//! and writes the product together with its `create_product:<id>` audit entry in a
//! single transaction, so a product never exists without its audit record.

use crate::{
    core::{Page, audit},
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Request to create a product.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewProduct {
    /// Unique business key
    pub sku: String,
    /// Human-readable name
    pub name: String,
    /// Optional category
    pub category: Option<String>,
    /// Purchase cost per unit
    pub unit_cost: Option<f64>,
    /// Selling price per unit
    pub selling_price: Option<f64>,
    /// Minimum stock level
    pub min_stock: i32,
    /// Reorder point
    pub reorder_point: i32,
    /// Supplier lead time in days
    pub lead_time_days: i32,
}

impl NewProduct {
    /// Creates a request with only the required fields set.
    #[must_use]
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sku.trim().is_empty() {
            return Err(Error::Validation {
                message: "SKU cannot be empty".to_string(),
            });
        }

        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "Product name cannot be empty".to_string(),
            });
        }

        for (field, value) in [
            ("unit_cost", self.unit_cost),
            ("selling_price", self.selling_price),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::Validation {
                        message: format!("{field} must be a non-negative number, got {value}"),
                    });
                }
            }
        }

        for (field, value) in [
            ("min_stock", self.min_stock),
            ("reorder_point", self.reorder_point),
            ("lead_time_days", self.lead_time_days),
        ] {
            if value < 0 {
                return Err(Error::Validation {
                    message: format!("{field} cannot be negative, got {value}"),
                });
            }
        }

        Ok(())
    }
}

/// Creates a product and appends its audit entry atomically.
///
/// # Errors
/// Returns an error if:
/// - The SKU or name is blank, or a numeric field is negative or not finite
/// - Another product already uses the SKU
/// - The database insert or the audit append fails (nothing is committed then)
#[instrument(skip(db, new_product), fields(sku = %new_product.sku))]
pub async fn create_product(
    db: &DatabaseConnection,
    new_product: NewProduct,
) -> Result<product::Model> {
    new_product.validate()?;
    let sku = new_product.sku.trim().to_string();

    let _guard = audit::lock_chain().await;
    let txn = db.begin().await?;

    if Product::find()
        .filter(product::Column::Sku.eq(sku.as_str()))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(Error::DuplicateSku { sku });
    }

    let model = product::ActiveModel {
        sku: Set(sku.clone()),
        name: Set(new_product.name.trim().to_string()),
        category: Set(new_product.category),
        unit_cost: Set(new_product.unit_cost),
        selling_price: Set(new_product.selling_price),
        min_stock: Set(new_product.min_stock),
        reorder_point: Set(new_product.reorder_point),
        lead_time_days: Set(new_product.lead_time_days),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let product = model.insert(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateSku { sku: sku.clone() },
        _ => Error::from(e),
    })?;

    audit::append_in(&txn, &format!("create_product:{}", product.id)).await?;
    txn.commit().await?;

    info!(product_id = product.id, "product created");
    Ok(product)
}

/// Retrieves a product by ID.
pub async fn get_product(db: &DatabaseConnection, product_id: i64) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by its SKU.
pub async fn get_product_by_sku(
    db: &DatabaseConnection,
    sku: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Sku.eq(sku.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns true when a product with this ID exists.
pub async fn product_exists<C>(db: &C, product_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = Product::find_by_id(product_id).count(db).await?;
    Ok(count > 0)
}

/// Lists products ordered by ID.
pub async fn list_products(db: &DatabaseConnection, page: Page) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Id)
        .offset(page.offset)
        .limit(page.limit)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // Blank SKU
        let result = create_product(&db, NewProduct::new("  ", "Widget")).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Blank name
        let result = create_product(&db, NewProduct::new("SKU-1", "")).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Negative policy field
        let request = NewProduct {
            reorder_point: -1,
            ..NewProduct::new("SKU-1", "Widget")
        };
        let result = create_product(&db, request).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Non-finite price
        let request = NewProduct {
            selling_price: Some(f64::NAN),
            ..NewProduct::new("SKU-1", "Widget")
        };
        let result = create_product(&db, request).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let request = NewProduct {
            category: Some("hardware".to_string()),
            unit_cost: Some(2.5),
            selling_price: Some(4.0),
            min_stock: 5,
            reorder_point: 10,
            lead_time_days: 3,
            ..NewProduct::new(" SKU-1 ", " Widget ")
        };
        let product = create_product(&db, request).await?;

        assert_eq!(product.sku, "SKU-1");
        assert_eq!(product.name, "Widget");
        assert_eq!(product.category.as_deref(), Some("hardware"));
        assert_eq!(product.selling_price, Some(4.0));
        assert_eq!(product.reorder_point, 10);

        let entries = audit::list_entries(&db).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, format!("create_product:{}", product.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected_without_audit() -> Result<()> {
        let db = setup_test_db().await?;

        create_test_product(&db, "SKU-1").await?;
        let result = create_test_product(&db, "SKU-1").await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateSku { sku } if sku == "SKU-1"));

        // Only the first creation was audited and only one product exists.
        assert_eq!(audit::list_entries(&db).await?.len(), 1);
        assert_eq!(list_products(&db, Page::default()).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_audit_append_rolls_back_product() -> Result<()> {
        let db = setup_test_db().await?;
        jam_audit_chain(&db).await?;

        let result = create_test_product(&db, "SKU-1").await;
        assert!(matches!(result.unwrap_err(), Error::Database(_)));

        assert!(get_product_by_sku(&db, "SKU-1").await?.is_none());
        assert!(list_products(&db, Page::default()).await?.is_empty());
        assert_eq!(audit::list_entries(&db).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_product_and_exists() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "SKU-1").await?;

        assert_eq!(get_product(&db, product.id).await?, Some(product.clone()));
        assert_eq!(get_product_by_sku(&db, "SKU-1").await?, Some(product.clone()));
        assert!(product_exists(&db, product.id).await?);

        assert!(get_product(&db, 999).await?.is_none());
        assert!(get_product_by_sku(&db, "missing").await?.is_none());
        assert!(!product_exists(&db, 999).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_products_paging() -> Result<()> {
        let db = setup_test_db().await?;
        for i in 0..5 {
            create_test_product(&db, &format!("SKU-{i}")).await?;
        }

        let all = list_products(&db, Page::default()).await?;
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].sku, "SKU-0");

        let page = list_products(&db, Page::new(2, 2)).await?;
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].sku, "SKU-2");
        assert_eq!(page[1].sku, "SKU-3");

        Ok(())
    }

    #[test]
    fn test_new_product_from_json_defaults() {
        let request: NewProduct =
            serde_json::from_str(r#"{"sku": "SKU-1", "name": "Test Product"}"#).unwrap();
        assert_eq!(request, NewProduct::new("SKU-1", "Test Product"));
        assert_eq!(request.min_stock, 0);
        assert!(request.category.is_none());
    }
}

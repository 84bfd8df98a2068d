//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Stock Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Guarded Stock Update                                 │
//! │                                                                         │
//! │  adjust_stock(&mut tx, "A", -3)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET stock = stock + (-3)                              │
//! │   WHERE id = 'A' AND stock + (-3) >= 0                                 │
//! │       │                                                                 │
//! │       ├── 1 row  → new stock returned                                  │
//! │       └── 0 rows → product missing?  NotFound                          │
//! │                    otherwise         InsufficientStock                 │
//! │                                                                         │
//! │  The read-check-write happens in one statement, so two sales racing   │
//! │  for the last unit cannot both succeed.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_new_product;
use tally_core::{CoreError, NewProduct, Product};

pub(crate) const SELECT_PRODUCT: &str = r#"
    SELECT id, code, name, category, supplier, stock, unit_price_cents,
           created_at, updated_at
    FROM products
"#;

/// Repository for catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.insert(&new_product).await?;
/// let same = repo.get_by_code(&product.code).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        debug!("Listing products");

        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its UUID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE code = ?1"))
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Validates and inserts a product.
    ///
    /// ## Errors
    /// - `DbError::Domain(Validation)` for bad input
    /// - `DbError::UniqueViolation { field: "code" }` if the code exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: new.code.trim().to_string(),
            name: new.name.trim().to_string(),
            category: new.category.trim().to_string(),
            supplier: new.supplier.trim().to_string(),
            stock: new.stock,
            unit_price_cents: new.unit_price_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, category, supplier,
                stock, unit_price_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.supplier)
        .bind(product.stock)
        .bind(product.unit_price_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &product.code),
            other => other,
        })?;

        info!(
            id = %product.id,
            code = %product.code,
            stock = product.stock,
            value = %product.total_value(),
            "Product created"
        );
        Ok(product)
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

/// Loads a product on an existing connection (usually a transaction).
pub(crate) async fn fetch_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Applies `stock += delta` to one product.
///
/// Takes a connection rather than the pool: stock only moves as part of a
/// sale ledger transaction, never on its own.
///
/// ## Returns
/// The new stock level.
///
/// ## Errors
/// - `DbError::NotFound` if the product doesn't exist
/// - `CoreError::InsufficientStock` if the result would be negative
pub async fn adjust_stock(conn: &mut SqliteConnection, product_id: &str, delta: i64) -> DbResult<i64> {
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    match new_stock {
        Some(stock) => {
            debug!(product_id = %product_id, delta, stock, "Stock adjusted");
            Ok(stock)
        }
        None => match fetch_by_id(conn, product_id).await? {
            None => Err(DbError::not_found("Product", product_id)),
            Some(product) => Err(CoreError::InsufficientStock {
                code: product.code,
                available: product.stock,
                requested: -delta,
            }
            .into()),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::ValidationError;

    fn new_product(code: &str, stock: i64, price: i64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: format!("Product {code}"),
            category: "General".to_string(),
            supplier: "Acme".to_string(),
            stock,
            unit_price_cents: price,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let created = repo.insert(&new_product("A-001", 10, 100)).await.unwrap();
        assert_eq!(created.total_value().cents(), 1000);

        let by_id = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "A-001");
        assert_eq!(by_id.stock, 10);

        let by_code = repo.get_by_code("A-001").await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&new_product("A-001", 1, 100)).await.unwrap();
        let err = repo.insert(&new_product("A-001", 5, 200)).await.unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "code");
                assert_eq!(value, "A-001");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().insert(&new_product("A-001", -1, 100)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_price_rejected_before_insert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let err = repo
            .insert(&new_product("HUGE", 1000, 100_000_000_000_000_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(repo.get_by_code("HUGE").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&new_product("OLD", 1, 100)).await.unwrap();
        repo.insert(&new_product("NEW", 1, 100)).await.unwrap();

        let codes: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.code).collect();
        assert_eq!(codes, vec!["NEW", "OLD"]);
    }

    #[tokio::test]
    async fn test_adjust_stock_guards_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&new_product("B-001", 2, 100)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(adjust_stock(&mut tx, &product.id, -2).await.unwrap(), 0);
        let err = adjust_stock(&mut tx, &product.id, -1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 0,
                requested: 1,
                ..
            })
        ));
        assert_eq!(adjust_stock(&mut tx, &product.id, 5).await.unwrap(), 5);

        let err = adjust_stock(&mut tx, "ghost", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        tx.rollback().await.unwrap();

        let product = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }
}

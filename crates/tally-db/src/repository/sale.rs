//! # Sale Repository
//!
//! The sale ledger: every operation that creates a sale or changes its
//! status runs as one SQLite transaction together with the stock updates
//! it implies.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one BEGIN IMMEDIATE transaction)                           │
//! │     ├── load products, price lines, check stock   (tally-core)         │
//! │     ├── INSERT sales        status = completed                         │
//! │     ├── INSERT sale_items   unit price snapshot                        │
//! │     └── adjust_stock(-qty)  per product                                │
//! │                                                                         │
//! │  2. CANCEL (one transaction)                                           │
//! │     ├── UPDATE sales ... WHERE status = 'completed'                    │
//! │     └── adjust_stock(+qty)  only if that UPDATE hit a row              │
//! │                                                                         │
//! │  3. DELETE                                                             │
//! │     └── DELETE sales (items cascade), stock untouched                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error inside a transaction drops it, which rolls everything back:
//! a failed sale leaves no sale row and no stock change behind.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::product::{adjust_stock, fetch_by_id, SELECT_PRODUCT};
use super::transaction::SELECT_TRANSACTION;
use super::{begin_immediate, random_document_suffix};
use crate::error::{DbError, DbResult};
use tally_core::ledger::{format_document_number, plan_sale_transition, price_sale, SaleTransition};
use tally_core::validation::validate_new_sale;
use tally_core::{
    NewSale, Product, Sale, SaleDetail, SaleItem, SaleLine, SaleStatus, Transaction,
    INVOICE_PREFIX,
};

pub(super) const SELECT_SALE: &str = r#"
    SELECT id, invoice_number, customer_name, payment_method,
           total_amount_cents, status, created_at, updated_at, cancelled_at
    FROM sales
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, sale_id, product_id, line_no, quantity,
           unit_price_cents, subtotal_cents, created_at
    FROM sale_items
"#;

/// Repository for the sale ledger.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Creates a completed sale and takes its stock, atomically.
    ///
    /// ## Steps
    /// 1. Validate input (no transaction yet)
    /// 2. BEGIN IMMEDIATE
    /// 3. Load each referenced product; price lines from catalog prices
    /// 4. Insert the sale and its items
    /// 5. Decrement stock per product (guarded UPDATE)
    /// 6. COMMIT
    ///
    /// ## Errors
    /// - `Domain(Validation)` - bad input
    /// - `Domain(ProductNotFound)` - unknown product id
    /// - `Domain(InsufficientStock)` - demand exceeds stock
    /// - `UniqueViolation` - invoice number collision (not retried)
    pub async fn create_sale(&self, new: &NewSale) -> DbResult<SaleDetail> {
        let invoice_number = format_document_number(
            INVOICE_PREFIX,
            Utc::now().date_naive(),
            random_document_suffix(),
        );
        self.create_sale_numbered(new, invoice_number).await
    }

    /// [`Self::create_sale`] with the invoice number already drawn.
    pub(crate) async fn create_sale_numbered(
        &self,
        new: &NewSale,
        invoice_number: String,
    ) -> DbResult<SaleDetail> {
        validate_new_sale(new)?;

        debug!(
            customer = %new.customer_name.trim(),
            lines = new.items.len(),
            invoice = %invoice_number,
            "Creating sale"
        );

        let mut tx = begin_immediate(&self.pool).await?;

        let mut products: HashMap<String, Product> = HashMap::new();
        for item in &new.items {
            if products.contains_key(&item.product_id) {
                continue;
            }
            if let Some(product) = fetch_by_id(&mut tx, &item.product_id).await? {
                products.insert(product.id.clone(), product);
            }
        }

        let priced = price_sale(&new.items, &products)?;

        for mismatch in &priced.mismatches {
            warn!(
                line = mismatch.line_no,
                product_id = %mismatch.product_id,
                field = mismatch.field,
                quoted = mismatch.quoted,
                computed = mismatch.computed,
                "Client-quoted amount differs from catalog price; using catalog price"
            );
        }

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            customer_name: new.customer_name.trim().to_string(),
            payment_method: new.payment_method.trim().to_string(),
            total_amount_cents: priced.total.cents(),
            status: SaleStatus::Completed,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_name, payment_method,
                total_amount_cents, status, created_at, updated_at, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.customer_name)
        .bind(&sale.payment_method)
        .bind(sale.total_amount_cents)
        .bind(sale.status)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.cancelled_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("invoice number", &sale.invoice_number)
            }
            other => other,
        })?;

        for line in &priced.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, line_no, quantity,
                    unit_price_cents, subtotal_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale.id)
            .bind(&line.product_id)
            .bind(line.line_no)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.subtotal_cents)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for (product_id, quantity) in &priced.demand {
            adjust_stock(&mut tx, product_id, -quantity).await?;
        }

        tx.commit().await?;

        info!(
            id = %sale.id,
            invoice = %sale.invoice_number,
            total = %priced.total,
            lines = priced.lines.len(),
            "Sale created"
        );

        self.require_detail(&sale.id).await
    }

    /// Cancels a sale and restores its stock.
    ///
    /// Cancelling an already cancelled sale is a no-op that returns the
    /// sale unchanged; stock is never restored twice.
    pub async fn cancel_sale(&self, sale_id: &str) -> DbResult<SaleDetail> {
        self.update_status(sale_id, SaleStatus::Cancelled).await
    }

    /// Moves a sale to `target` following the sale transition table.
    ///
    /// ## Errors
    /// - `NotFound` - unknown sale
    /// - `Domain(InvalidStatusTransition)` - `cancelled → completed`
    pub async fn update_status(&self, sale_id: &str, target: SaleStatus) -> DbResult<SaleDetail> {
        debug!(sale_id = %sale_id, target = %target, "Updating sale status");

        let mut tx = begin_immediate(&self.pool).await?;

        let sale = fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        match plan_sale_transition(sale_id, sale.status, target)? {
            SaleTransition::Unchanged => {
                debug!(sale_id = %sale_id, status = %sale.status, "Sale status unchanged");
            }
            SaleTransition::Cancel => {
                if cancel_in_tx(&mut tx, sale_id).await? {
                    info!(
                        sale_id = %sale_id,
                        invoice = %sale.invoice_number,
                        "Sale cancelled, stock restored"
                    );
                } else {
                    debug!(sale_id = %sale_id, "Sale already cancelled by a concurrent request");
                }
            }
        }

        tx.commit().await?;

        self.require_detail(sale_id).await
    }

    /// Hard-deletes a sale and its items. Stock is NOT restored.
    pub async fn delete_sale(&self, sale_id: &str) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        info!(sale_id = %sale_id, "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, sale_id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in request order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "{SELECT_ITEM} WHERE sale_id = ?1 ORDER BY line_no"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a sale with its items, their products and linked journal entries.
    pub async fn get_detail(&self, sale_id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(sale_id).await? else {
            return Ok(None);
        };

        let items = self.get_items(sale_id).await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE id IN (SELECT product_id FROM sale_items WHERE sale_id = ?1)"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "{SELECT_TRANSACTION} WHERE sale_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(vec![sale], items, products, transactions)
            .into_iter()
            .next())
    }

    /// Lists all sales with items and products, newest first.
    pub async fn list_details(&self) -> DbResult<Vec<SaleDetail>> {
        debug!("Listing sales");

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, SaleItem>(&format!("{SELECT_ITEM} ORDER BY sale_id, line_no"))
            .fetch_all(&self.pool)
            .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE id IN (SELECT DISTINCT product_id FROM sale_items)"
        ))
        .fetch_all(&self.pool)
        .await?;

        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "{SELECT_TRANSACTION} WHERE sale_id IS NOT NULL ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let details = assemble(sales, items, products, transactions);
        debug!(count = details.len(), "Listed sales");
        Ok(details)
    }

    async fn require_detail(&self, sale_id: &str) -> DbResult<SaleDetail> {
        self.get_detail(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

/// Flips a completed sale to cancelled and puts its stock back.
///
/// Returns `false` if the guarded UPDATE matched nothing, meaning another
/// transaction cancelled the sale first. Stock is only restored by the
/// transaction whose UPDATE actually changed the row.
async fn cancel_in_tx(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = ?2, cancelled_at = ?3, updated_at = ?3
        WHERE id = ?1 AND status = ?4
        "#,
    )
    .bind(sale_id)
    .bind(SaleStatus::Cancelled)
    .bind(now)
    .bind(SaleStatus::Completed)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    let restock: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT product_id, SUM(quantity)
        FROM sale_items
        WHERE sale_id = ?1
        GROUP BY product_id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    for (product_id, quantity) in &restock {
        adjust_stock(conn, product_id, *quantity).await?;
    }

    Ok(true)
}

/// Joins sale headers, items, products and journal entries into
/// [`SaleDetail`]s, keeping the order of `sales` and of `transactions`.
fn assemble(
    sales: Vec<Sale>,
    items: Vec<SaleItem>,
    products: Vec<Product>,
    transactions: Vec<Transaction>,
) -> Vec<SaleDetail> {
    let products: HashMap<String, Product> =
        products.into_iter().map(|p| (p.id.clone(), p)).collect();

    let mut lines_by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
    for item in items {
        let product = products.get(&item.product_id).cloned();
        lines_by_sale
            .entry(item.sale_id.clone())
            .or_default()
            .push(SaleLine { item, product });
    }

    let mut txns_by_sale: HashMap<String, Vec<Transaction>> = HashMap::new();
    for txn in transactions {
        if let Some(sale_id) = txn.sale_id.clone() {
            txns_by_sale.entry(sale_id).or_default().push(txn);
        }
    }

    sales
        .into_iter()
        .map(|sale| {
            let mut items = lines_by_sale.remove(&sale.id).unwrap_or_default();
            items.sort_by_key(|line| line.item.line_no);
            let transactions = txns_by_sale.remove(&sale.id).unwrap_or_default();
            SaleDetail {
                sale,
                items,
                transactions,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::ledger::is_document_number;
    use tally_core::{CoreError, NewProduct, NewSaleItem};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn product(db: &Database, code: &str, stock: i64, price: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                code: code.to_string(),
                name: format!("Product {code}"),
                category: "General".to_string(),
                supplier: "Acme".to_string(),
                stock,
                unit_price_cents: price,
            })
            .await
            .unwrap()
    }

    fn sale_of(items: Vec<NewSaleItem>) -> NewSale {
        NewSale {
            customer_name: "Walk-in".to_string(),
            payment_method: "cash".to_string(),
            items,
        }
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    async fn sale_count(db: &Database) -> usize {
        db.sales().list_details().await.unwrap().len()
    }

    #[tokio::test]
    async fn test_create_and_cancel_restores_stock() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;

        let detail = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new(&a.id, 3)]))
            .await
            .unwrap();

        assert_eq!(detail.sale.total_amount_cents, 300);
        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert_eq!(detail.items_total(), detail.sale.total_amount());
        assert!(is_document_number("INV", &detail.sale.invoice_number));
        assert_eq!(detail.items[0].product.as_ref().unwrap().code, "A-001");
        assert_eq!(stock_of(&db, &a.id).await, 7);

        let cancelled = db.sales().cancel_sale(&detail.sale.id).await.unwrap();
        assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);
        assert!(cancelled.sale.cancelled_at.is_some());
        assert_eq!(cancelled.sale.total_amount_cents, 300);
        assert_eq!(stock_of(&db, &a.id).await, 10);
    }

    #[tokio::test]
    async fn test_double_cancel_restores_once() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;
        let detail = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new(&a.id, 4)]))
            .await
            .unwrap();

        db.sales().cancel_sale(&detail.sale.id).await.unwrap();
        let again = db.sales().cancel_sale(&detail.sale.id).await.unwrap();

        assert_eq!(again.sale.status, SaleStatus::Cancelled);
        assert_eq!(stock_of(&db, &a.id).await, 10);
    }

    #[tokio::test]
    async fn test_insufficient_stock_mutates_nothing() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;
        let b = product(&db, "B-001", 2, 100).await;

        let err = db
            .sales()
            .create_sale(&sale_of(vec![
                NewSaleItem::new(&a.id, 1),
                NewSaleItem::new(&b.id, 5),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { ref code, .. }) if code == "B-001"
        ));
        assert_eq!(stock_of(&db, &a.id).await, 10);
        assert_eq!(stock_of(&db, &b.id).await, 2);
        assert_eq!(sale_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_repeated_product_lines_share_stock() {
        let db = setup().await;
        let a = product(&db, "A-001", 3, 100).await;

        let err = db
            .sales()
            .create_sale(&sale_of(vec![
                NewSaleItem::new(&a.id, 2),
                NewSaleItem::new(&a.id, 2),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
        assert_eq!(stock_of(&db, &a.id).await, 3);

        let detail = db
            .sales()
            .create_sale(&sale_of(vec![
                NewSaleItem::new(&a.id, 1),
                NewSaleItem::new(&a.id, 2),
            ]))
            .await
            .unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].item.line_no, 1);
        assert_eq!(stock_of(&db, &a.id).await, 0);

        db.sales().cancel_sale(&detail.sale.id).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 3);
    }

    #[tokio::test]
    async fn test_invoice_collision_rolls_back() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;
        let number = "INV-20261019-0042".to_string();

        db.sales()
            .create_sale_numbered(&sale_of(vec![NewSaleItem::new(&a.id, 2)]), number.clone())
            .await
            .unwrap();

        let err = db
            .sales()
            .create_sale_numbered(&sale_of(vec![NewSaleItem::new(&a.id, 3)]), number.clone())
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "invoice number");
                assert_eq!(value, number);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock_of(&db, &a.id).await, 8);
        assert_eq!(sale_count(&db).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_on_file_database_serialize() {
        let path = std::env::temp_dir().join(format!("tally-concurrent-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(5))
            .await
            .unwrap();
        let a = product(&db, "A-001", 1000, 100).await;

        let handles: Vec<_> = (0..20)
            .map(|n| {
                let db = db.clone();
                let product_id = a.id.clone();
                tokio::spawn(async move {
                    db.sales()
                        .create_sale_numbered(
                            &sale_of(vec![NewSaleItem::new(&product_id, 1)]),
                            format!("INV-20261019-{n:04}"),
                        )
                        .await
                })
            })
            .collect();

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                failures.push(err.to_string());
            }
        }

        assert!(failures.is_empty(), "concurrent sales failed: {failures:?}");
        assert_eq!(stock_of(&db, &a.id).await, 980);
        assert_eq!(sale_count(&db).await, 20);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = setup().await;
        let err = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new("ghost", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_client_prices_are_ignored() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;

        let detail = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem {
                quoted_unit_price_cents: Some(1),
                quoted_subtotal_cents: Some(1),
                ..NewSaleItem::new(&a.id, 2)
            }]))
            .await
            .unwrap();

        assert_eq!(detail.items[0].item.unit_price_cents, 100);
        assert_eq!(detail.items[0].item.subtotal_cents, 200);
        assert_eq!(detail.sale.total_amount_cents, 200);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;
        let id = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new(&a.id, 3)]))
            .await
            .unwrap()
            .sale
            .id;

        // completed → completed is a no-op
        let same = db.sales().update_status(&id, SaleStatus::Completed).await.unwrap();
        assert_eq!(same.sale.status, SaleStatus::Completed);
        assert_eq!(stock_of(&db, &a.id).await, 7);

        db.sales().update_status(&id, SaleStatus::Cancelled).await.unwrap();
        assert_eq!(stock_of(&db, &a.id).await, 10);

        let err = db.sales().update_status(&id, SaleStatus::Completed).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatusTransition { .. })));
        assert_eq!(stock_of(&db, &a.id).await, 10);

        let err = db.sales().update_status("missing", SaleStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_does_not_restore_stock() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;
        let id = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new(&a.id, 3)]))
            .await
            .unwrap()
            .sale
            .id;

        db.sales().delete_sale(&id).await.unwrap();

        assert!(db.sales().get_detail(&id).await.unwrap().is_none());
        assert!(db.sales().get_items(&id).await.unwrap().is_empty());
        assert_eq!(stock_of(&db, &a.id).await, 7);

        let err = db.sales().delete_sale(&id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = setup().await;
        let a = product(&db, "A-001", 10, 100).await;

        let first = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new(&a.id, 1)]))
            .await
            .unwrap();
        let second = db
            .sales()
            .create_sale(&sale_of(vec![NewSaleItem::new(&a.id, 2)]))
            .await
            .unwrap();

        let list = db.sales().list_details().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].sale.id, second.sale.id);
        assert_eq!(list[1].sale.id, first.sale.id);
        for detail in &list {
            assert_eq!(detail.items_total(), detail.sale.total_amount());
        }
    }
}

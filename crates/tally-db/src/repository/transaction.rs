//! # Transaction Repository
//!
//! The money movement journal. Entries are append-only: they are recorded
//! `completed`, never edited, and survive the deletion of a linked sale
//! (the link is cleared by `ON DELETE SET NULL`).

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::sale::SELECT_SALE;
use crate::error::{DbError, DbResult};
use tally_core::validation::validate_new_transaction;
use tally_core::{NewTransaction, Sale, Transaction, TransactionLine, TransactionStatus};

pub(super) const SELECT_TRANSACTION: &str = r#"
    SELECT id, txn_type, amount_cents, description, status,
           user_id, sale_id, created_at
    FROM transactions
"#;

/// Repository for the transaction journal.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records a `completed` journal entry.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - bad input
    /// - `NotFound` - `sale_id` names no sale
    pub async fn record(&self, new: &NewTransaction) -> DbResult<Transaction> {
        validate_new_transaction(new)?;

        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            txn_type: new.txn_type,
            amount_cents: new.amount_cents,
            description: new.description.trim().to_string(),
            status: TransactionStatus::Completed,
            user_id: new.user_id.trim().to_string(),
            sale_id: new.sale_id.as_deref().map(|id| id.trim().to_string()),
            created_at: Utc::now(),
        };

        debug!(id = %txn.id, txn_type = %txn.txn_type, "Recording transaction");

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, txn_type, amount_cents, description, status,
                user_id, sale_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&txn.id)
        .bind(txn.txn_type)
        .bind(txn.amount_cents)
        .bind(&txn.description)
        .bind(txn.status)
        .bind(&txn.user_id)
        .bind(&txn.sale_id)
        .bind(txn.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match (DbError::from(e), &txn.sale_id) {
            (DbError::ForeignKeyViolation { .. }, Some(sale_id)) => {
                DbError::not_found("Sale", sale_id)
            }
            (other, _) => other,
        })?;

        info!(
            id = %txn.id,
            txn_type = %txn.txn_type,
            amount = %txn.amount(),
            user_id = %txn.user_id,
            "Transaction recorded"
        );
        Ok(txn)
    }

    /// Gets a journal entry by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(&format!("{SELECT_TRANSACTION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(txn)
    }

    /// Lists all entries, newest first.
    pub async fn list(&self) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(&format!(
            "{SELECT_TRANSACTION} ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }

    /// Lists all entries newest first, each with its linked sale header.
    pub async fn list_lines(&self) -> DbResult<Vec<TransactionLine>> {
        let txns = self.list().await?;

        let sales: HashMap<String, Sale> = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE id IN (SELECT sale_id FROM transactions WHERE sale_id IS NOT NULL)"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|sale| (sale.id.clone(), sale))
        .collect();

        debug!(count = txns.len(), linked = sales.len(), "Listed transactions");

        Ok(txns
            .into_iter()
            .map(|transaction| {
                let sale = transaction
                    .sale_id
                    .as_ref()
                    .and_then(|id| sales.get(id))
                    .cloned();
                TransactionLine { transaction, sale }
            })
            .collect())
    }

    /// Lists the entries linked to one sale, newest first.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(&format!(
            "{SELECT_TRANSACTION} WHERE sale_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::{CoreError, NewProduct, NewSale, NewSaleItem, TransactionType};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn expense(amount_cents: i64) -> NewTransaction {
        NewTransaction {
            txn_type: TransactionType::Expense,
            amount_cents,
            description: "Cleaning supplies".to_string(),
            user_id: "cashier-1".to_string(),
            sale_id: None,
        }
    }

    async fn completed_sale(db: &Database) -> Sale {
        let product = db
            .products()
            .insert(&NewProduct {
                code: "A-001".to_string(),
                name: "Widget".to_string(),
                category: "General".to_string(),
                supplier: "Acme".to_string(),
                stock: 10,
                unit_price_cents: 250,
            })
            .await
            .unwrap();

        db.sales()
            .create_sale(&NewSale {
                customer_name: "Walk-in".to_string(),
                payment_method: "cash".to_string(),
                items: vec![NewSaleItem::new(&product.id, 2)],
            })
            .await
            .unwrap()
            .sale
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let db = setup().await;
        let repo = db.transactions();

        let first = repo.record(&expense(1_000)).await.unwrap();
        let second = repo
            .record(&NewTransaction {
                txn_type: TransactionType::Income,
                ..expense(2_000)
            })
            .await
            .unwrap();

        assert_eq!(first.status, TransactionStatus::Completed);
        assert_eq!(first.user_id, "cashier-1");

        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id]);

        let fetched = repo.get_by_id(&second.id).await.unwrap().unwrap();
        assert_eq!(fetched.txn_type, TransactionType::Income);
        assert_eq!(fetched.amount_cents, 2_000);
    }

    #[tokio::test]
    async fn test_invalid_entry_rejected() {
        let db = setup().await;
        let err = db.transactions().record(&expense(0)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(db.transactions().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_sale_is_not_found() {
        let db = setup().await;
        let err = db
            .transactions()
            .record(&NewTransaction {
                sale_id: Some("ghost".to_string()),
                ..expense(500)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Sale"));
    }

    #[tokio::test]
    async fn test_sale_link_survives_as_null_after_delete() {
        let db = setup().await;
        let sale = completed_sale(&db).await;

        let entry = db
            .transactions()
            .record(&NewTransaction {
                txn_type: TransactionType::Sale,
                sale_id: Some(sale.id.clone()),
                ..expense(500)
            })
            .await
            .unwrap();

        let lines = db.transactions().list_lines().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].sale.as_ref().map(|s| s.invoice_number.as_str()),
            Some(sale.invoice_number.as_str())
        );
        assert_eq!(db.transactions().list_for_sale(&sale.id).await.unwrap().len(), 1);

        let detail = db.sales().get_detail(&sale.id).await.unwrap().unwrap();
        assert_eq!(detail.transactions.len(), 1);
        assert_eq!(detail.transactions[0].id, entry.id);

        db.sales().delete_sale(&sale.id).await.unwrap();

        let kept = db.transactions().get_by_id(&entry.id).await.unwrap().unwrap();
        assert!(kept.sale_id.is_none());
        assert!(db.transactions().list_lines().await.unwrap()[0].sale.is_none());
    }
}

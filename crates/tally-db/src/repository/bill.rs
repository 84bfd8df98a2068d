//! # Bill Repository
//!
//! Payables owed by the business. Bills start `pending` and end either
//! `paid` or `cancelled`; see [`tally_core::ledger::plan_bill_transition`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::random_document_suffix;
use crate::error::{DbError, DbResult};
use tally_core::ledger::{format_document_number, plan_bill_transition, BillTransition};
use tally_core::validation::validate_new_bill;
use tally_core::{Bill, BillStatus, NewBill, BILL_PREFIX};

const SELECT_BILL: &str = r#"
    SELECT id, number, bill_type, amount_cents, due_date, description,
           status, created_at, updated_at, paid_at
    FROM bills
"#;

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Validates and inserts a pending bill with a fresh `BILL-` number.
    pub async fn create(&self, new: &NewBill) -> DbResult<Bill> {
        validate_new_bill(new)?;

        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            number: format_document_number(BILL_PREFIX, now.date_naive(), random_document_suffix()),
            bill_type: new.bill_type.trim().to_string(),
            amount_cents: new.amount_cents,
            due_date: new.due_date,
            description: new.description.trim().to_string(),
            status: BillStatus::Pending,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        debug!(id = %bill.id, number = %bill.number, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, number, bill_type, amount_cents, due_date, description,
                status, created_at, updated_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.number)
        .bind(&bill.bill_type)
        .bind(bill.amount_cents)
        .bind(bill.due_date)
        .bind(&bill.description)
        .bind(bill.status)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .bind(bill.paid_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("bill number", &bill.number),
            other => other,
        })?;

        info!(id = %bill.id, number = %bill.number, amount = %bill.amount(), "Bill created");
        Ok(bill)
    }

    /// Lists all bills, newest first.
    pub async fn list(&self) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "{SELECT_BILL} ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Gets a bill by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!("{SELECT_BILL} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bill)
    }

    /// Moves a bill to `target`.
    ///
    /// The UPDATE is guarded on `status = 'pending'`; if another request
    /// settled the bill first the re-read state is checked again, so the
    /// caller sees either a no-op or an invalid transition.
    pub async fn update_status(&self, id: &str, target: BillStatus) -> DbResult<Bill> {
        debug!(bill_id = %id, target = %target, "Updating bill status");

        let bill = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", id))?;

        let now = Utc::now();
        let paid_at = match plan_bill_transition(id, bill.status, target)? {
            BillTransition::Unchanged => return Ok(bill),
            BillTransition::MarkPaid => Some(now),
            BillTransition::Cancel => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE bills
            SET status = ?2, paid_at = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(target)
        .bind(paid_at)
        .bind(now)
        .bind(BillStatus::Pending)
        .execute(&self.pool)
        .await?;

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", id))?;

        if result.rows_affected() == 0 {
            // Lost a race: judge the request against the state that won.
            plan_bill_transition(id, current.status, target)?;
        } else {
            info!(bill_id = %id, number = %current.number, status = %target, "Bill status updated");
        }

        Ok(current)
    }
}

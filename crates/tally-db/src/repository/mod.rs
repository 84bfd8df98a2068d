//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.sales().create_sale(new_sale)                        │
//! │       ▼                                                                 │
//! │  SaleRepository ──────────────┐                                        │
//! │  ├── create_sale              │ same transaction                       │
//! │  ├── cancel_sale              ▼                                        │
//! │  └── update_status      product::adjust_stock(&mut conn, id, delta)    │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and stock adjustment
//! - [`sale::SaleRepository`] - Sale ledger (create, cancel, status, delete)
//! - [`bill::BillRepository`] - Bills and their payment status
//! - [`report::ReportRepository`] - Dashboard aggregations
//! - [`transaction::TransactionRepository`] - Money movement journal

pub mod bill;
pub mod product;
pub mod report;
pub mod sale;
pub mod transaction;

use rand::Rng;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Opens a ledger transaction that holds the write lock from its first
/// statement.
///
/// A deferred `BEGIN` would read under a shared lock and fail with
/// `SQLITE_BUSY` when it later tries to write while another sale commits.
/// `BEGIN IMMEDIATE` waits on the pool's busy timeout instead.
pub(crate) async fn begin_immediate(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Draws the random `NNNN` suffix of an invoice or bill number.
pub(crate) fn random_document_suffix() -> u32 {
    rand::thread_rng().gen_range(0..10_000)
}

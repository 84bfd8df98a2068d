//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┤  id (UUID)      │◄──┤  sale_id (FK)   │       │
//! │  │  code (business)│   │  invoice_number │   │  product_id (FK)│       │
//! │  │  stock          │   │  status         │   │  unit_price     │       │
//! │  │  unit_price     │   │  total_amount   │   │  (snapshot)     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Bill       │   │   SaleStatus    │   │   BillStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  number         │   │  Completed      │   │  Pending        │       │
//! │  │  amount         │   │  Cancelled      │   │  Paid           │       │
//! │  │  due_date       │   └─────────────────┘   │  Cancelled      │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Transaction    │   journal entry: type, amount, recorder,          │
//! │  │  ─────────────  │   optional sale link (SET NULL on delete)         │
//! │  │  sale_id? (FK)  │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (code, invoice_number, number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product held in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product code - business identifier, unique across the catalog.
    pub code: String,

    /// Display name shown on invoices.
    pub name: String,

    /// Category used for dashboard grouping.
    pub category: String,

    pub supplier: String,

    /// Units on hand. Never negative (database CHECK constraint).
    pub stock: i64,

    /// Price in cents (smallest currency unit).
    pub unit_price_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Value of the stock on hand: `stock × unit_price`.
    ///
    /// Derived on read so it can never drift from `stock`. Saturates rather
    /// than overflowing on rows written before the catalog bounds existed.
    pub fn total_value(&self) -> Money {
        self.unit_price().multiply_quantity(self.stock)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub category: String,
    pub supplier: String,
    pub stock: i64,
    pub unit_price_cents: i64,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Sales are created `Completed`; the only change is to `Cancelled`,
/// which is terminal. See [`crate::ledger::plan_sale_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Sale has been paid and stock taken.
    Completed,
    /// Sale was cancelled and its stock restored.
    Cancelled,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 2] = [SaleStatus::Completed, SaleStatus::Cancelled];

    /// Wire/database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses request input. Anything outside the enum (including the
/// `pending` state used by bills) is a validation error.
impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: SaleStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header. Line items live in [`SaleItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `INV-YYYYMMDD-NNNN`
    pub invoice_number: String,
    pub customer_name: String,
    pub payment_method: String,
    /// Sum of item subtotals. Immutable after creation.
    pub total_amount_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Position of the line in the incoming request.
    pub line_no: i64,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A sale line joined with the product it references.
///
/// `product` is `None` only if the product row has since been removed
/// by an administrative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub item: SaleItem,
    pub product: Option<Product>,
}

/// A sale with its lines, as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleLine>,
    /// Journal entries linked to this sale, newest first.
    pub transactions: Vec<Transaction>,
}

impl SaleDetail {
    /// Sum of line subtotals. Equals `sale.total_amount()` for every
    /// sale the ledger creates.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|line| line.item.subtotal()).sum()
    }
}

/// Input for the sale ledger's create operation.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub customer_name: String,
    pub payment_method: String,
    pub items: Vec<NewSaleItem>,
}

/// One requested line of a new sale.
///
/// The quoted fields are what the client computed on its side. They are
/// compared with the server-side figures but never persisted.
#[derive(Debug, Clone)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    pub quoted_unit_price_cents: Option<i64>,
    pub quoted_subtotal_cents: Option<i64>,
}

impl NewSaleItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        NewSaleItem {
            product_id: product_id.into(),
            quantity,
            quoted_unit_price_cents: None,
            quoted_subtotal_cents: None,
        }
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// The status of a bill (a payable owed by the business).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Paid,
    Cancelled,
}

impl BillStatus {
    pub const ALL: [BillStatus; 3] = [BillStatus::Pending, BillStatus::Paid, BillStatus::Cancelled];

    pub const fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Paid => "paid",
            BillStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Pending
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BillStatus::Pending),
            "paid" => Ok(BillStatus::Paid),
            "cancelled" => Ok(BillStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: BillStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A bill to be paid by the business (rent, utilities, supplier invoices).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,
    /// `BILL-YYYYMMDD-NNNN`
    pub number: String,
    pub bill_type: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub description: String,
    pub status: BillStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Bill {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for creating a bill.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub bill_type: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub description: String,
}

// =============================================================================
// Transaction Journal
// =============================================================================

/// What kind of money movement a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Purchase,
    Expense,
    Income,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Sale,
        TransactionType::Purchase,
        TransactionType::Expense,
        TransactionType::Income,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: TransactionType::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            })
    }
}

/// Settlement state of a journal entry. Entries recorded through the
/// journal are written `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the money movement journal.
///
/// `user_id` is the authenticated subject that recorded the entry.
/// `sale_id` optionally ties the entry to a sale; it is cleared if that
/// sale is later deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub txn_type: TransactionType,
    pub amount_cents: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub user_id: String,
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A journal entry together with the sale it is linked to, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionLine {
    pub transaction: Transaction,
    pub sale: Option<Sale>,
}

/// Input for recording a journal entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub txn_type: TransactionType,
    pub amount_cents: i64,
    pub description: String,
    pub user_id: String,
    pub sale_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

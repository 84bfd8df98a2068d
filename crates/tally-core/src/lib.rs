//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate is the **heart** of Tally POS. It contains the sale ledger
//! rules, money arithmetic and validation as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │    Inventory ──► Billing ──► Sales ──► Dashboard               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-api (axum handlers)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  pricing  │  │   rules   │  │   │
//! │  │   │   Sale    │  │           │  │transitions│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │         SQLite transactions, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, Bill, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`ledger`] - Sale pricing, stock checks and status transitions
//! - [`report`] - Dashboard aggregation shapes and date bucketing
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(10000); // $100.00
//! let subtotal = price.multiply_quantity(3);
//! assert_eq!(subtotal.cents(), 30000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines allowed in a single sale.
///
/// ## Business Reason
/// Prevents runaway requests and keeps the sale transaction short.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest unit price a product may carry, in cents ($100,000,000.00).
///
/// Keeps `stock × price` and every sale total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Largest stock level a product may be created with.
pub const MAX_STOCK: i64 = 10_000_000;

/// Stock level at or below which a product counts as "low stock" on the
/// dashboard when no threshold is configured.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Prefix of sale invoice numbers (`INV-YYYYMMDD-NNNN`).
pub const INVOICE_PREFIX: &str = "INV";

/// Prefix of bill numbers (`BILL-YYYYMMDD-NNNN`).
pub const BILL_PREFIX: &str = "BILL";

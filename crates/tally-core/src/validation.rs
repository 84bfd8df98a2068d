//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (tally-api)                                     │
//! │  ├── Typed request structs (serde)                                     │
//! │  └── Malformed JSON rejected before any logic runs                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, ranges                                  │
//! │  └── Runs before a transaction is opened                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (product code, invoice number, bill number)                │
//! │  ├── CHECK (stock >= 0, quantity >= 1)                                 │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_product_code, validate_quantity};
//!
//! assert!(validate_product_code("A-001").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewBill, NewProduct, NewSale, NewTransaction};
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_SALE_ITEMS, MAX_STOCK};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for free-text fields (customer name, supplier, ...).
pub const MAX_TEXT_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_code;
///
/// assert!(validate_product_code("COKE-330").is_ok());
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("has space").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (non-empty, at most 200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, MAX_TEXT_LEN)
}

/// Validates a required free-text field.
///
/// The value is trimmed before checking, so `"   "` counts as missing.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must be at most [`MAX_ITEM_QUANTITY`] (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents. Zero is allowed (free items).
///
/// ## Rules
/// - Must be at least 0
/// - Must be at most [`MAX_PRICE_CENTS`]
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "unitPrice".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates an initial stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_STOCK,
        });
    }

    Ok(())
}

/// Validates a bill amount. Must be strictly positive.
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates the number of lines in a sale.
pub fn validate_sale_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

/// Validates everything about a product that can be checked without
/// touching the database. Code uniqueness is left to the UNIQUE index.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_code(&product.code)?;
    validate_product_name(&product.name)?;
    validate_required_text("category", &product.category, MAX_TEXT_LEN)?;
    validate_required_text("supplier", &product.supplier, MAX_TEXT_LEN)?;
    validate_stock(product.stock)?;
    validate_price_cents(product.unit_price_cents)?;
    Ok(())
}

/// Validates a sale request before the ledger opens its transaction.
///
/// Stock and product existence are checked later, inside the transaction.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    validate_required_text("customerName", &sale.customer_name, MAX_TEXT_LEN)?;
    validate_required_text("paymentMethod", &sale.payment_method, 50)?;
    validate_sale_item_count(sale.items.len())?;

    for item in &sale.items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        validate_quantity(item.quantity)?;
    }

    Ok(())
}

/// Validates a bill request.
pub fn validate_new_bill(bill: &NewBill) -> ValidationResult<()> {
    validate_required_text("billType", &bill.bill_type, 50)?;
    validate_amount_cents(bill.amount_cents)?;
    validate_required_text("description", &bill.description, 500)?;
    Ok(())
}

/// Validates a journal entry. The linked sale, if any, is checked by the
/// foreign key.
pub fn validate_new_transaction(txn: &NewTransaction) -> ValidationResult<()> {
    validate_amount_cents(txn.amount_cents)?;
    validate_required_text("description", &txn.description, 500)?;
    validate_required_text("userId", &txn.user_id, MAX_TEXT_LEN)?;

    if let Some(sale_id) = &txn.sale_id {
        if sale_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "saleId".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger / business rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-api errors (in app)                                             │
//! │  └── ApiError         - JSON body + HTTP status                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the catalog,
/// sale ledger or billing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete sale.
    ///
    /// ## When This Occurs
    /// - Requested quantity exceeds the product's current stock
    /// - Two lines of the same product together exceed stock
    ///
    /// ## User Workflow
    /// ```text
    /// POST /api/sales  items: [{ B, qty: 5 }]
    ///      │
    ///      ▼
    /// Check stock: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { code: "B-001", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// 400 "Insufficient stock for B-001: available 2, requested 5"
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Bill not found.
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// The requested status change is not in the transition table.
    ///
    /// ## When This Occurs
    /// - Re-completing a cancelled sale
    /// - Paying a cancelled bill, or reopening a paid one
    #[error("{entity} {id} is {from}, cannot change to {to}")]
    InvalidStatusTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// Used for early validation before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid code characters, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "B-001".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for B-001: available 2, requested 5"
        );

        let err = CoreError::InvalidStatusTransition {
            entity: "Sale".to_string(),
            id: "abc".to_string(),
            from: "cancelled".to_string(),
            to: "completed".to_string(),
        };
        assert_eq!(err.to_string(), "Sale abc is cancelled, cannot change to completed");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customerName".to_string(),
        };
        assert_eq!(err.to_string(), "customerName is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

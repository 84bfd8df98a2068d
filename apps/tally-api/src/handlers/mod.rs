//! # HTTP Handlers
//!
//! All routes exposed to the React frontend.
//!
//! ## Organization
//! ```text
//! handlers/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── health.rs     ◄─── GET /health
//! ├── products.rs   ◄─── /api/products (catalog)
//! ├── sales.rs      ◄─── /api/sales (sale ledger)
//! ├── bills.rs      ◄─── /api/bills (payables)
//! ├── transactions.rs ◄─ /api/transactions (money journal)
//! └── dashboard.rs  ◄─── /api/dashboard/* (read-only reports)
//! ```
//!
//! ## How Handlers Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Request Flow                                         │
//! │                                                                         │
//! │  fetch('/api/sales', { method: 'POST', body })                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  TraceLayer ──► require_auth ──► Caller extension                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  async fn create_sale(                                                  │
//! │      State(state): State<AppState>,       ◄── shared pool              │
//! │      Extension(caller): Extension<Caller>, ◄── from require_auth       │
//! │      body: Result<Json<CreateSaleRequest>, JsonRejection>,             │
//! │  ) -> ApiResult<Json<SaleDto>>                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Frontend receives camelCase JSON, money as integer cents               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bodies are taken as `Result<Json<T>, JsonRejection>` so that malformed
//! JSON is reported as a `VALIDATION_ERROR` instead of axum's plain-text
//! rejection.

pub mod bills;
pub mod dashboard;
pub mod health;
pub mod products;
pub mod sales;
pub mod transactions;

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::Deserialize;

/// Wire format for timestamps.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

/// A client-sent amount that must not fail deserialization.
///
/// The web client computes prices in major units with floating point
/// (`2.5`), older callers send integer cents, and some send strings.
/// Anything else is kept as [`LenientAmount::Other`] and reads as `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LenientAmount {
    Integer(i64),
    Decimal(f64),
    Text(String),
    Other(IgnoredAny),
}

impl LenientAmount {
    /// Reads the value as cents (`250` → 250).
    pub fn as_cents(&self) -> Option<i64> {
        match self {
            LenientAmount::Integer(cents) => Some(*cents),
            other => other.scaled(1.0),
        }
    }

    /// Reads the value as major units and converts to cents (`2.5` → 250).
    pub fn major_as_cents(&self) -> Option<i64> {
        match self {
            LenientAmount::Integer(units) => units.checked_mul(100),
            other => other.scaled(100.0),
        }
    }

    fn scaled(&self, factor: f64) -> Option<i64> {
        let value = match self {
            LenientAmount::Integer(n) => *n as f64,
            LenientAmount::Decimal(v) => *v,
            LenientAmount::Text(raw) => raw.trim().parse::<f64>().ok()?,
            LenientAmount::Other(_) => return None,
        };

        let cents = (value * factor).round();
        // i64::MAX is not exactly representable; stay strictly below it.
        (cents.is_finite() && cents.abs() < i64::MAX as f64).then_some(cents as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> LenientAmount {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lenient_amount_reads_any_json() {
        assert_eq!(parse("250").as_cents(), Some(250));
        assert_eq!(parse("2.5").major_as_cents(), Some(250));
        assert_eq!(parse("5.0").major_as_cents(), Some(500));
        assert_eq!(parse("0.1").major_as_cents(), Some(10));
        assert_eq!(parse("3").major_as_cents(), Some(300));
        assert_eq!(parse("\"12.34\"").major_as_cents(), Some(1234));

        assert_eq!(parse("\"abc\"").as_cents(), None);
        assert_eq!(parse("true").as_cents(), None);
        assert_eq!(parse("{\"x\": 1}").major_as_cents(), None);
        assert_eq!(parse("1e300").major_as_cents(), None);
        assert_eq!(parse("9223372036854775807").major_as_cents(), None);
    }
}

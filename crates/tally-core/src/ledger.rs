//! # Sale Ledger Rules
//!
//! The pure half of the sale ledger: pricing a sale against catalog rows,
//! checking stock, deciding status transitions and formatting document
//! numbers. `tally-db` wraps these in a transaction.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CreateSale ──► ┌───────────┐   cancel    ┌───────────┐                │
//! │                  │ COMPLETED │ ──────────► │ CANCELLED │ ◄──┐ no-op     │
//! │                  └───────────┘  +stock     └───────────┘ ───┘           │
//! │                     ▲     │                      │                      │
//! │                     └─────┘ no-op                ╳ completed (422)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bill Lifecycle
//! ```text
//!                  ┌──────► PAID
//!   PENDING ───────┤
//!                  └──────► CANCELLED       (both terminal)
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{BillStatus, NewSaleItem, Product, SaleStatus};

// =============================================================================
// Pricing
// =============================================================================

/// A sale line priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub line_no: i64,
    pub product_id: String,
    pub quantity: i64,
    /// Snapshot of `Product.unit_price_cents` at pricing time.
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

/// A client-quoted figure that disagrees with the server's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteMismatch {
    pub line_no: i64,
    pub product_id: String,
    pub field: &'static str,
    pub quoted: i64,
    pub computed: i64,
}

/// Result of [`price_sale`].
#[derive(Debug, Clone)]
pub struct PricedSale {
    pub lines: Vec<PricedLine>,
    pub total: Money,
    /// Total quantity requested per product, in order of first appearance.
    pub demand: Vec<(String, i64)>,
    pub mismatches: Vec<QuoteMismatch>,
}

/// Prices a sale against the products it references.
///
/// ## Rules
/// - Every `product_id` must be present in `products`
/// - Quantities of repeated products are summed before the stock check,
///   so two lines of 2 against a stock of 3 fail
/// - Unit price is always the catalog price; client quotes are only
///   compared and reported in [`PricedSale::mismatches`]
///
/// ## Example
/// ```rust
/// # use std::collections::HashMap;
/// # use chrono::Utc;
/// use tally_core::ledger::price_sale;
/// use tally_core::{NewSaleItem, Product};
///
/// let now = Utc::now();
/// let a = Product {
///     id: "a".into(), code: "A".into(), name: "A".into(),
///     category: "c".into(), supplier: "s".into(),
///     stock: 10, unit_price_cents: 100, created_at: now, updated_at: now,
/// };
/// let products = HashMap::from([(a.id.clone(), a)]);
///
/// let priced = price_sale(&[NewSaleItem::new("a", 3)], &products).unwrap();
/// assert_eq!(priced.total.cents(), 300);
/// ```
pub fn price_sale(
    items: &[NewSaleItem],
    products: &HashMap<String, Product>,
) -> CoreResult<PricedSale> {
    let mut lines = Vec::with_capacity(items.len());
    let mut demand: Vec<(String, i64)> = Vec::new();
    let mut mismatches = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let line_no = idx as i64 + 1;
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        let unit_price = product.unit_price();
        let subtotal = unit_price
            .checked_multiply_quantity(item.quantity)
            .ok_or_else(|| amount_overflow("subtotal"))?;

        if let Some(quoted) = item.quoted_unit_price_cents {
            if quoted != unit_price.cents() {
                mismatches.push(QuoteMismatch {
                    line_no,
                    product_id: item.product_id.clone(),
                    field: "unitPrice",
                    quoted,
                    computed: unit_price.cents(),
                });
            }
        }
        if let Some(quoted) = item.quoted_subtotal_cents {
            if quoted != subtotal.cents() {
                mismatches.push(QuoteMismatch {
                    line_no,
                    product_id: item.product_id.clone(),
                    field: "subtotal",
                    quoted,
                    computed: subtotal.cents(),
                });
            }
        }

        match demand.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, qty)) => *qty += item.quantity,
            None => demand.push((item.product_id.clone(), item.quantity)),
        }

        lines.push(PricedLine {
            line_no,
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price_cents: unit_price.cents(),
            subtotal_cents: subtotal.cents(),
        });
    }

    for (product_id, requested) in &demand {
        // Present: every demand entry came from a resolved line above.
        if let Some(product) = products.get(product_id) {
            if !product.can_sell(*requested) {
                return Err(CoreError::InsufficientStock {
                    code: product.code.clone(),
                    available: product.stock,
                    requested: *requested,
                });
            }
        }
    }

    let total = lines
        .iter()
        .try_fold(0i64, |acc, line| acc.checked_add(line.subtotal_cents))
        .map(Money::from_cents)
        .ok_or_else(|| amount_overflow("totalAmount"))?;

    Ok(PricedSale {
        lines,
        total,
        demand,
        mismatches,
    })
}

fn amount_overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Status Transitions
// =============================================================================

/// What the ledger must do to move a sale between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleTransition {
    /// Target equals current status. Nothing is written.
    Unchanged,
    /// `completed → cancelled`: flip status and restore stock.
    Cancel,
}

/// Applies the sale transition table.
///
/// | from \ to  | completed | cancelled |
/// |------------|-----------|-----------|
/// | completed  | Unchanged | Cancel    |
/// | cancelled  | rejected  | Unchanged |
pub fn plan_sale_transition(
    sale_id: &str,
    from: SaleStatus,
    to: SaleStatus,
) -> CoreResult<SaleTransition> {
    match (from, to) {
        (SaleStatus::Completed, SaleStatus::Completed)
        | (SaleStatus::Cancelled, SaleStatus::Cancelled) => Ok(SaleTransition::Unchanged),
        (SaleStatus::Completed, SaleStatus::Cancelled) => Ok(SaleTransition::Cancel),
        (SaleStatus::Cancelled, SaleStatus::Completed) => Err(CoreError::InvalidStatusTransition {
            entity: "Sale".to_string(),
            id: sale_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

/// What the billing repository must do for a bill status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillTransition {
    Unchanged,
    MarkPaid,
    Cancel,
}

/// Applies the bill transition table: only `pending` may move, and only
/// to `paid` or `cancelled`.
pub fn plan_bill_transition(
    bill_id: &str,
    from: BillStatus,
    to: BillStatus,
) -> CoreResult<BillTransition> {
    match (from, to) {
        _ if from == to => Ok(BillTransition::Unchanged),
        (BillStatus::Pending, BillStatus::Paid) => Ok(BillTransition::MarkPaid),
        (BillStatus::Pending, BillStatus::Cancelled) => Ok(BillTransition::Cancel),
        _ => Err(CoreError::InvalidStatusTransition {
            entity: "Bill".to_string(),
            id: bill_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

// =============================================================================
// Document Numbers
// =============================================================================

/// Formats `PREFIX-YYYYMMDD-NNNN`. `seq` is reduced modulo 10000.
///
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::ledger::format_document_number;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
/// assert_eq!(format_document_number("INV", date, 42), "INV-20260307-0042");
/// ```
pub fn format_document_number(prefix: &str, date: NaiveDate, seq: u32) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), seq % 10_000)
}

/// Checks that `value` has the shape `PREFIX-YYYYMMDD-NNNN`.
pub fn is_document_number(prefix: &str, value: &str) -> bool {
    let Some(rest) = value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };

    match rest.split_once('-') {
        Some((date, seq)) => {
            date.len() == 8
                && seq.len() == 4
                && date.bytes().all(|b| b.is_ascii_digit())
                && seq.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, code: &str, stock: i64, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("Product {code}"),
            category: "General".to_string(),
            supplier: "Acme".to_string(),
            stock,
            unit_price_cents: price,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<String, Product> {
        products.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    #[test]
    fn test_price_sale_snapshots_catalog_price() {
        let products = catalog(vec![product("a", "A-001", 10, 100)]);
        let priced = price_sale(&[NewSaleItem::new("a", 3)], &products).unwrap();

        assert_eq!(priced.total.cents(), 300);
        assert_eq!(priced.lines.len(), 1);
        assert_eq!(priced.lines[0].unit_price_cents, 100);
        assert_eq!(priced.lines[0].subtotal_cents, 300);
        assert_eq!(priced.demand, vec![("a".to_string(), 3)]);
        assert!(priced.mismatches.is_empty());
    }

    #[test]
    fn test_price_sale_total_is_sum_of_subtotals() {
        let products = catalog(vec![
            product("a", "A-001", 10, 100),
            product("b", "B-001", 10, 250),
        ]);
        let priced = price_sale(
            &[NewSaleItem::new("a", 2), NewSaleItem::new("b", 3)],
            &products,
        )
        .unwrap();

        let sum: i64 = priced.lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(priced.total.cents(), sum);
        assert_eq!(sum, 950);
    }

    #[test]
    fn test_price_sale_insufficient_stock() {
        let products = catalog(vec![product("b", "B-001", 2, 100)]);
        let err = price_sale(&[NewSaleItem::new("b", 5)], &products).unwrap_err();

        match err {
            CoreError::InsufficientStock {
                code,
                available,
                requested,
            } => {
                assert_eq!(code, "B-001");
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_price_sale_sums_repeated_products() {
        let products = catalog(vec![product("a", "A-001", 3, 100)]);
        let err = price_sale(
            &[NewSaleItem::new("a", 2), NewSaleItem::new("a", 2)],
            &products,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { requested: 4, .. }));
    }

    #[test]
    fn test_price_sale_unknown_product() {
        let err = price_sale(&[NewSaleItem::new("ghost", 1)], &HashMap::new()).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_price_sale_rejects_overflowing_amounts() {
        let products = catalog(vec![product("a", "A-001", 1000, i64::MAX / 2)]);

        let err = price_sale(&[NewSaleItem::new("a", 999)], &products).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "subtotal"
        ));

        let err = price_sale(
            &[NewSaleItem::new("a", 1), NewSaleItem::new("a", 1), NewSaleItem::new("a", 1)],
            &products,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "totalAmount"
        ));
    }

    #[test]
    fn test_price_sale_reports_quote_mismatch() {
        let products = catalog(vec![product("a", "A-001", 10, 100)]);
        let item = NewSaleItem {
            quoted_unit_price_cents: Some(1),
            quoted_subtotal_cents: Some(3),
            ..NewSaleItem::new("a", 3)
        };
        let priced = price_sale(&[item], &products).unwrap();

        assert_eq!(priced.total.cents(), 300);
        assert_eq!(priced.mismatches.len(), 2);
        assert_eq!(priced.mismatches[0].field, "unitPrice");
        assert_eq!(priced.mismatches[1].computed, 300);
    }

    #[test]
    fn test_sale_transition_table() {
        use SaleStatus::*;
        assert_eq!(
            plan_sale_transition("s", Completed, Cancelled).unwrap(),
            SaleTransition::Cancel
        );
        assert_eq!(
            plan_sale_transition("s", Completed, Completed).unwrap(),
            SaleTransition::Unchanged
        );
        assert_eq!(
            plan_sale_transition("s", Cancelled, Cancelled).unwrap(),
            SaleTransition::Unchanged
        );
        assert!(matches!(
            plan_sale_transition("s", Cancelled, Completed),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_bill_transition_table() {
        use BillStatus::*;
        assert_eq!(plan_bill_transition("b", Pending, Paid).unwrap(), BillTransition::MarkPaid);
        assert_eq!(plan_bill_transition("b", Pending, Cancelled).unwrap(), BillTransition::Cancel);
        assert_eq!(plan_bill_transition("b", Paid, Paid).unwrap(), BillTransition::Unchanged);
        assert!(plan_bill_transition("b", Paid, Pending).is_err());
        assert!(plan_bill_transition("b", Cancelled, Paid).is_err());
        assert!(plan_bill_transition("b", Paid, Cancelled).is_err());
    }

    #[test]
    fn test_document_numbers() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let invoice = format_document_number("INV", date, 7);
        assert_eq!(invoice, "INV-20261019-0007");
        assert!(is_document_number("INV", &invoice));

        assert_eq!(format_document_number("BILL", date, 12345), "BILL-20261019-2345");
        assert!(!is_document_number("INV", "BILL-20261019-0007"));
        assert!(!is_document_number("INV", "INV-2026101-0007"));
        assert!(!is_document_number("INV", "INV-20261019-07"));
    }
}

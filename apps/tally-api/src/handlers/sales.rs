//! # Sale Handlers
//!
//! HTTP surface of the sale ledger.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Lifecycle                                       │
//! │                                                                         │
//! │  POST /api/sales ──► completed ──► PATCH {status:"cancelled"} ──┐       │
//! │                          │         POST /{id}/cancel ───────────┤       │
//! │                          │                                      ▼       │
//! │                          │                                  cancelled   │
//! │                          │                          (stock restored)    │
//! │                          │                                      │       │
//! │                          └──── DELETE /{id} ◄───────────────────┘       │
//! │                               (no stock restore)                        │
//! │                                                                         │
//! │  PATCH cancelled → completed  ──► 422 INVALID_TRANSITION                │
//! │  PATCH {status:"pending"}     ──► 400 VALIDATION_ERROR                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are always taken from the catalog. Quotes sent by the client
//! (`unitPrice`/`subtotal` in major units, or `unitPriceCents`/
//! `subtotalCents`) are only compared and logged, and a quote that can't be
//! read as a number never fails the request.

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::products::ProductDto;
use super::transactions::TransactionDto;
use super::{timestamp, LenientAmount};
use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tally_core::{NewSale, NewSaleItem, SaleDetail, SaleLine, SaleStatus, ValidationError};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemDto {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub created_at: String,
    pub product: Option<ProductDto>,
}

impl From<SaleLine> for SaleItemDto {
    fn from(line: SaleLine) -> Self {
        let item = line.item;
        SaleItemDto {
            id: item.id,
            sale_id: item.sale_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            subtotal_cents: item.subtotal_cents,
            created_at: timestamp(item.created_at),
            product: line.product.map(ProductDto::from),
        }
    }
}

/// A sale with its items, each embedding the product it sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub payment_method: String,
    pub total_amount_cents: i64,
    pub status: SaleStatus,
    pub created_at: String,
    pub updated_at: String,
    pub cancelled_at: Option<String>,
    pub items: Vec<SaleItemDto>,
    /// Journal entries recorded against this sale, newest first.
    pub transactions: Vec<TransactionDto>,
}

impl From<SaleDetail> for SaleDto {
    fn from(detail: SaleDetail) -> Self {
        let sale = detail.sale;
        SaleDto {
            id: sale.id,
            invoice_number: sale.invoice_number,
            customer_name: sale.customer_name,
            payment_method: sale.payment_method,
            total_amount_cents: sale.total_amount_cents,
            status: sale.status,
            created_at: timestamp(sale.created_at),
            updated_at: timestamp(sale.updated_at),
            cancelled_at: sale.cancelled_at.map(timestamp),
            items: detail.items.into_iter().map(SaleItemDto::from).collect(),
            transactions: detail
                .transactions
                .into_iter()
                .map(TransactionDto::from)
                .collect(),
        }
    }
}

/// One line of `POST /api/sales`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleItemRequest {
    pub product_id: String,
    pub quantity: Option<i64>,
    /// Major units, as the web client sends them.
    pub unit_price: Option<LenientAmount>,
    pub subtotal: Option<LenientAmount>,
    pub unit_price_cents: Option<LenientAmount>,
    pub subtotal_cents: Option<LenientAmount>,
}

impl SaleItemRequest {
    fn quoted_unit_price_cents(&self) -> Option<i64> {
        quoted_cents(&self.unit_price_cents, &self.unit_price)
    }

    fn quoted_subtotal_cents(&self) -> Option<i64> {
        quoted_cents(&self.subtotal_cents, &self.subtotal)
    }
}

/// Cents wins over major units when both are sent.
fn quoted_cents(cents: &Option<LenientAmount>, major: &Option<LenientAmount>) -> Option<i64> {
    cents
        .as_ref()
        .and_then(LenientAmount::as_cents)
        .or_else(|| major.as_ref().and_then(LenientAmount::major_as_cents))
}

/// Body of `POST /api/sales`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSaleRequest {
    pub customer_name: String,
    pub payment_method: String,
    pub items: Vec<SaleItemRequest>,
}

impl CreateSaleRequest {
    fn into_new_sale(self) -> Result<NewSale, ValidationError> {
        let items = self
            .items
            .into_iter()
            .map(|item| {
                let quantity = item.quantity.ok_or_else(|| ValidationError::Required {
                    field: "quantity".to_string(),
                })?;
                Ok(NewSaleItem {
                    quoted_unit_price_cents: item.quoted_unit_price_cents(),
                    quoted_subtotal_cents: item.quoted_subtotal_cents(),
                    product_id: item.product_id,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(NewSale {
            customer_name: self.customer_name,
            payment_method: self.payment_method,
            items,
        })
    }
}

/// Body of `PATCH /api/sales/{id}` and `PATCH /api/bills/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

impl UpdateStatusRequest {
    pub(crate) fn parse<S>(self) -> Result<S, ValidationError>
    where
        S: FromStr<Err = ValidationError>,
    {
        let raw = self
            .status
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "status".to_string(),
            })?;
        raw.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Routes
// =============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route(
            "/{id}",
            get(get_sale).patch(update_sale_status).delete(delete_sale),
        )
        .route("/{id}/cancel", post(cancel_sale))
}

/// `GET /api/sales` - newest first, items and products embedded.
pub async fn list_sales(State(state): State<AppState>) -> ApiResult<Json<Vec<SaleDto>>> {
    let sales = state.db.sales().list_details().await?;
    debug!(count = sales.len(), "list_sales");
    Ok(Json(sales.into_iter().map(SaleDto::from).collect()))
}

/// `GET /api/sales/{id}`
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDto>> {
    let detail = state
        .db
        .sales()
        .get_detail(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;

    Ok(Json(SaleDto::from(detail)))
}

/// `POST /api/sales` - records a completed sale and takes its stock.
///
/// Answers 200 with the stored sale. All-or-nothing: on any error no
/// sale, item or stock change is persisted.
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> ApiResult<Json<SaleDto>> {
    let Json(request) = body?;
    let new = request.into_new_sale()?;

    let detail = state.db.sales().create_sale(&new).await?;

    info!(
        sale_id = %detail.sale.id,
        invoice = %detail.sale.invoice_number,
        total_cents = detail.sale.total_amount_cents,
        by = %caller.subject,
        "create_sale"
    );

    Ok(Json(SaleDto::from(detail)))
}

/// `PATCH /api/sales/{id}` with `{"status": "completed" | "cancelled"}`.
pub async fn update_sale_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<SaleDto>> {
    let Json(request) = body?;
    let target: SaleStatus = request.parse()?;

    let detail = state.db.sales().update_status(&id, target).await?;

    info!(
        sale_id = %id,
        status = %detail.sale.status,
        by = %caller.subject,
        "update_sale_status"
    );

    Ok(Json(SaleDto::from(detail)))
}

/// `POST /api/sales/{id}/cancel` - idempotent.
pub async fn cancel_sale(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDto>> {
    let detail = state.db.sales().cancel_sale(&id).await?;

    info!(sale_id = %id, by = %caller.subject, "cancel_sale");

    Ok(Json(SaleDto::from(detail)))
}

/// `DELETE /api/sales/{id}` - removes the sale and its items. Stock is not
/// restored; cancel first to give it back.
pub async fn delete_sale(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.sales().delete_sale(&id).await?;

    info!(sale_id = %id, by = %caller.subject, "delete_sale");

    Ok(Json(MessageResponse {
        message: "Sale deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_item(json: &str) -> NewSaleItem {
        let request: CreateSaleRequest = serde_json::from_str(json).unwrap();
        request.into_new_sale().unwrap().items.remove(0)
    }

    #[test]
    fn test_decimal_quotes_read_as_major_units() {
        let item = first_item(
            r#"{"customerName":"Ada","paymentMethod":"cash",
                "items":[{"productId":"p-1","quantity":2,"unitPrice":2.5,"subtotal":5.0}]}"#,
        );
        assert_eq!(item.quoted_unit_price_cents, Some(250));
        assert_eq!(item.quoted_subtotal_cents, Some(500));
    }

    #[test]
    fn test_unreadable_quotes_are_dropped() {
        let item = first_item(
            r#"{"customerName":"Ada","paymentMethod":"cash",
                "items":[{"productId":"p-1","quantity":1,"unitPrice":"n/a","subtotal":[1]}]}"#,
        );
        assert_eq!(item.quantity, 1);
        assert_eq!(item.quoted_unit_price_cents, None);
        assert_eq!(item.quoted_subtotal_cents, None);
    }

    #[test]
    fn test_cents_quote_preferred() {
        let item = first_item(
            r#"{"customerName":"Ada","paymentMethod":"cash",
                "items":[{"productId":"p-1","quantity":1,"unitPrice":9.99,"unitPriceCents":250}]}"#,
        );
        assert_eq!(item.quoted_unit_price_cents, Some(250));
    }
}

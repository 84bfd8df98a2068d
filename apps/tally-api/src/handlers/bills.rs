//! # Bill Handlers
//!
//! Payables owed by the shop. A bill starts `pending` and is settled once,
//! either `paid` or `cancelled`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::sales::UpdateStatusRequest;
use super::timestamp;
use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tally_core::{Bill, BillStatus, NewBill, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDto {
    pub id: String,
    pub number: String,
    pub bill_type: String,
    pub amount_cents: i64,
    /// `YYYY-MM-DD`
    pub due_date: String,
    pub description: String,
    pub status: BillStatus,
    pub created_at: String,
    pub updated_at: String,
    pub paid_at: Option<String>,
}

impl From<Bill> for BillDto {
    fn from(b: Bill) -> Self {
        BillDto {
            id: b.id,
            number: b.number,
            bill_type: b.bill_type,
            amount_cents: b.amount_cents,
            due_date: b.due_date.format("%Y-%m-%d").to_string(),
            description: b.description,
            status: b.status,
            created_at: timestamp(b.created_at),
            updated_at: timestamp(b.updated_at),
            paid_at: b.paid_at.map(timestamp),
        }
    }
}

/// Body of `POST /api/bills`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBillRequest {
    #[serde(alias = "type")]
    pub bill_type: String,
    pub amount_cents: Option<i64>,
    pub due_date: String,
    pub description: String,
}

impl CreateBillRequest {
    fn into_new_bill(self) -> Result<NewBill, ValidationError> {
        let amount_cents = self.amount_cents.ok_or_else(|| ValidationError::Required {
            field: "amountCents".to_string(),
        })?;

        Ok(NewBill {
            bill_type: self.bill_type,
            amount_cents,
            due_date: parse_due_date(&self.due_date)?,
            description: self.description,
        })
    }
}

/// Accepts a plain `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
fn parse_due_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: "dueDate".to_string(),
        });
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|at| at.date_naive()))
        .map_err(|_| ValidationError::InvalidFormat {
            field: "dueDate".to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bills).post(create_bill))
        .route("/{id}", get(get_bill).patch(update_bill_status))
}

/// `GET /api/bills` - newest first.
pub async fn list_bills(State(state): State<AppState>) -> ApiResult<Json<Vec<BillDto>>> {
    let bills = state.db.bills().list().await?;
    debug!(count = bills.len(), "list_bills");
    Ok(Json(bills.into_iter().map(BillDto::from).collect()))
}

/// `GET /api/bills/{id}`
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BillDto>> {
    let bill = state
        .db
        .bills()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill", &id))?;

    Ok(Json(BillDto::from(bill)))
}

/// `POST /api/bills` - 201 with the new `pending` bill.
pub async fn create_bill(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<CreateBillRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BillDto>)> {
    let Json(request) = body?;
    let new = request.into_new_bill()?;

    let bill = state.db.bills().create(&new).await?;

    info!(
        bill_id = %bill.id,
        number = %bill.number,
        amount_cents = bill.amount_cents,
        by = %caller.subject,
        "create_bill"
    );

    Ok((StatusCode::CREATED, Json(BillDto::from(bill))))
}

/// `PATCH /api/bills/{id}` with `{"status": "pending" | "paid" | "cancelled"}`.
pub async fn update_bill_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<BillDto>> {
    let Json(request) = body?;
    let target: BillStatus = request.parse()?;

    let bill = state.db.bills().update_status(&id, target).await?;

    info!(
        bill_id = %id,
        status = %bill.status,
        by = %caller.subject,
        "update_bill_status"
    );

    Ok(Json(BillDto::from(bill)))
}

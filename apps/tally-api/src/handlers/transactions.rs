//! # Transaction Handlers
//!
//! The money movement journal. Entries are recorded by the authenticated
//! caller and never edited afterwards.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{timestamp, LenientAmount};
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::{
    NewTransaction, Sale, SaleStatus, Transaction, TransactionLine, TransactionStatus,
    TransactionType, ValidationError,
};

/// Header of the sale an entry is linked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedSaleDto {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub total_amount_cents: i64,
    pub status: SaleStatus,
}

impl From<Sale> for LinkedSaleDto {
    fn from(sale: Sale) -> Self {
        LinkedSaleDto {
            id: sale.id,
            invoice_number: sale.invoice_number,
            customer_name: sale.customer_name,
            total_amount_cents: sale.total_amount_cents,
            status: sale.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    #[serde(rename = "type")]
    pub txn_type: TransactionType,
    pub amount_cents: i64,
    pub description: String,
    pub status: TransactionStatus,
    pub user_id: String,
    pub sale_id: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<LinkedSaleDto>,
}

impl From<Transaction> for TransactionDto {
    fn from(t: Transaction) -> Self {
        TransactionDto {
            id: t.id,
            txn_type: t.txn_type,
            amount_cents: t.amount_cents,
            description: t.description,
            status: t.status,
            user_id: t.user_id,
            sale_id: t.sale_id,
            created_at: timestamp(t.created_at),
            sale: None,
        }
    }
}

impl From<TransactionLine> for TransactionDto {
    fn from(line: TransactionLine) -> Self {
        TransactionDto {
            sale: line.sale.map(LinkedSaleDto::from),
            ..TransactionDto::from(line.transaction)
        }
    }
}

/// Body of `POST /api/transactions`.
///
/// The amount is read from `amountCents`, or from `amount` in major units
/// as the web client sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub txn_type: String,
    pub amount_cents: Option<i64>,
    pub amount: Option<LenientAmount>,
    pub description: String,
    pub sale_id: Option<String>,
}

impl CreateTransactionRequest {
    fn into_new_transaction(self, caller: &Caller) -> Result<NewTransaction, ValidationError> {
        if self.txn_type.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "type".to_string(),
            });
        }
        let txn_type: TransactionType = self.txn_type.parse()?;

        let amount_cents = match (self.amount_cents, &self.amount) {
            (Some(cents), _) => cents,
            (None, Some(amount)) => {
                amount
                    .major_as_cents()
                    .ok_or_else(|| ValidationError::InvalidFormat {
                        field: "amount".to_string(),
                        reason: "expected a number".to_string(),
                    })?
            }
            (None, None) => {
                return Err(ValidationError::Required {
                    field: "amount".to_string(),
                })
            }
        };

        Ok(NewTransaction {
            txn_type,
            amount_cents,
            description: self.description,
            user_id: caller.subject.clone(),
            sale_id: self.sale_id.filter(|id| !id.trim().is_empty()),
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_transactions).post(create_transaction))
}

/// `GET /api/transactions` - newest first, linked sale embedded.
pub async fn list_transactions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TransactionDto>>> {
    let lines = state.db.transactions().list_lines().await?;
    debug!(count = lines.len(), "list_transactions");
    Ok(Json(lines.into_iter().map(TransactionDto::from).collect()))
}

/// `POST /api/transactions` - 201 with the `completed` entry, recorded
/// under the caller's subject.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransactionDto>)> {
    let Json(request) = body?;
    let new = request.into_new_transaction(&caller)?;

    let txn = state.db.transactions().record(&new).await?;

    info!(
        transaction_id = %txn.id,
        txn_type = %txn.txn_type,
        amount_cents = txn.amount_cents,
        by = %caller.subject,
        "create_transaction"
    );

    Ok((StatusCode::CREATED, Json(TransactionDto::from(txn))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> Caller {
        Caller {
            subject: "cashier-1".to_string(),
            role: "cashier".to_string(),
        }
    }

    fn request(json: &str) -> CreateTransactionRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_amount_from_major_units() {
        let new = request(r#"{"type":"expense","amount":12.5,"description":"Ink"}"#)
            .into_new_transaction(&caller())
            .unwrap();
        assert_eq!(new.txn_type, TransactionType::Expense);
        assert_eq!(new.amount_cents, 1250);
        assert_eq!(new.user_id, "cashier-1");
        assert!(new.sale_id.is_none());
    }

    #[test]
    fn test_amount_cents_preferred() {
        let new = request(r#"{"type":"income","amountCents":700,"amount":1,"description":"Tip"}"#)
            .into_new_transaction(&caller())
            .unwrap();
        assert_eq!(new.amount_cents, 700);
    }

    #[test]
    fn test_rejects_missing_or_unknown_fields() {
        let err = request(r#"{"amount":1,"description":"x"}"#)
            .into_new_transaction(&caller())
            .unwrap_err();
        assert!(matches!(err, ValidationError::Required { ref field } if field == "type"));

        let err = request(r#"{"type":"refund","amount":1,"description":"x"}"#)
            .into_new_transaction(&caller())
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { .. }));

        let err = request(r#"{"type":"expense","description":"x"}"#)
            .into_new_transaction(&caller())
            .unwrap_err();
        assert!(matches!(err, ValidationError::Required { ref field } if field == "amount"));

        let err = request(r#"{"type":"expense","amount":"lots","description":"x"}"#)
            .into_new_transaction(&caller())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }
}

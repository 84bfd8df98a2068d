//! # Product Handlers
//!
//! Catalog listing, lookup and creation.
//!
//! Stock only changes through the sale ledger.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::timestamp;
use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tally_core::{NewProduct, Product, ValidationError};

/// Product DTO for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub code: String,
    pub name: String,
    pub category: String,
    pub supplier: String,
    pub stock: i64,
    pub unit_price_cents: i64,
    /// `stock × unitPriceCents`, derived on read.
    pub total_value_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        let total_value_cents = p.total_value().cents();
        ProductDto {
            id: p.id,
            code: p.code,
            name: p.name,
            category: p.category,
            supplier: p.supplier,
            stock: p.stock,
            unit_price_cents: p.unit_price_cents,
            total_value_cents,
            created_at: timestamp(p.created_at),
            updated_at: timestamp(p.updated_at),
        }
    }
}

/// Body of `POST /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub category: String,
    pub supplier: String,
    #[serde(alias = "stocks")]
    pub stock: Option<i64>,
    pub unit_price_cents: Option<i64>,
}

impl CreateProductRequest {
    fn into_new_product(self) -> Result<NewProduct, ValidationError> {
        let stock = self.stock.ok_or_else(|| ValidationError::Required {
            field: "stock".to_string(),
        })?;
        let unit_price_cents = self.unit_price_cents.ok_or_else(|| ValidationError::Required {
            field: "unitPriceCents".to_string(),
        })?;

        Ok(NewProduct {
            code: self.code,
            name: self.name,
            category: self.category,
            supplier: self.supplier,
            stock,
            unit_price_cents,
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/{id}", get(get_product))
}

/// `GET /api/products` - newest first.
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductDto>>> {
    let products = state.db.products().list().await?;
    debug!(count = products.len(), "list_products");
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

/// `GET /api/products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDto>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(ProductDto::from(product)))
}

/// `POST /api/products` - 201 with the stored product, 409 on a taken code.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductDto>)> {
    let Json(request) = body?;
    let new = request.into_new_product()?;

    let product = state.db.products().insert(&new).await?;

    info!(
        product_id = %product.id,
        code = %product.code,
        by = %caller.subject,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(ProductDto::from(product))))
}

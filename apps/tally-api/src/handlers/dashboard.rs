//! # Dashboard Handlers
//!
//! Read-only numbers for the dashboard, computed from committed rows.
//! "Today" is the current UTC date.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use super::products::ProductDto;
use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::report::{CategoryCount, DashboardStats, RevenueExpenses, Series};

const DEFAULT_TREND_DAYS: u32 = 7;
const MAX_TREND_DAYS: u32 = 90;
const DEFAULT_MONTHS: u32 = 6;
const MAX_MONTHS: u32 = 24;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthsQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/sales-trend", get(sales_trend))
        .route("/revenue-expenses", get(revenue_expenses))
        .route("/category-distribution", get(category_distribution))
        .route("/low-stock", get(low_stock))
}

/// `GET /api/dashboard/stats`
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let today = Utc::now().date_naive();
    let stats = state
        .db
        .reports()
        .dashboard_stats(state.low_stock_threshold, today)
        .await?;
    Ok(Json(stats))
}

/// `GET /api/dashboard/sales-trend?days=7`
pub async fn sales_trend(
    State(state): State<AppState>,
    query: Result<Query<TrendQuery>, QueryRejection>,
) -> ApiResult<Json<Series>> {
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS).clamp(1, MAX_TREND_DAYS);

    let series = state
        .db
        .reports()
        .sales_trend(Utc::now().date_naive(), days)
        .await?;
    Ok(Json(series))
}

/// `GET /api/dashboard/revenue-expenses?months=6`
pub async fn revenue_expenses(
    State(state): State<AppState>,
    query: Result<Query<MonthsQuery>, QueryRejection>,
) -> ApiResult<Json<RevenueExpenses>> {
    let Query(query) = query?;
    let months = query.months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS);

    let report = state
        .db
        .reports()
        .revenue_expenses(Utc::now().date_naive(), months)
        .await?;
    Ok(Json(report))
}

/// `GET /api/dashboard/category-distribution`
pub async fn category_distribution(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryCount>>> {
    Ok(Json(state.db.reports().category_distribution().await?))
}

/// `GET /api/dashboard/low-stock` - defaults to the configured threshold.
pub async fn low_stock(
    State(state): State<AppState>,
    query: Result<Query<ThresholdQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    let Query(query) = query?;
    let threshold = query.threshold.unwrap_or(state.low_stock_threshold).max(0);

    let products = state.db.reports().low_stock(threshold).await?;
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

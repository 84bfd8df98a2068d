//! # Report Repository
//!
//! Read-only aggregations for the dashboard. Only committed rows are
//! visible, and cancelled sales never count towards revenue.
//!
//! SQL does the sums; date bucketing happens in
//! [`tally_core::report`] so empty days and months come back as zeros.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::product::SELECT_PRODUCT;
use crate::error::DbResult;
use tally_core::report::{
    daily_series, daily_window, month_start, monthly_series, monthly_window, start_of_day,
    CategoryCount, DashboardStats, RevenueExpenses, Series,
};
use tally_core::{BillStatus, Product, SaleStatus};

/// Repository for dashboard queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Headline numbers. `today` decides which month is "current".
    pub async fn dashboard_stats(&self, low_stock_threshold: i64, today: NaiveDate) -> DbResult<DashboardStats> {
        debug!(low_stock_threshold, %today, "Computing dashboard stats");

        let (total_revenue_cents, completed_sales): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_amount_cents), 0), COUNT(*) FROM sales WHERE status = ?1",
        )
        .bind(SaleStatus::Completed)
        .fetch_one(&self.pool)
        .await?;

        let cancelled_sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE status = ?1")
            .bind(SaleStatus::Cancelled)
            .fetch_one(&self.pool)
            .await?;

        let (product_count, inventory_units, inventory_value_cents, low_stock_count): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(stock), 0),
                       COALESCE(SUM(stock * unit_price_cents), 0),
                       COALESCE(SUM(CASE WHEN stock <= ?1 THEN 1 ELSE 0 END), 0)
                FROM products
                "#,
            )
            .bind(low_stock_threshold)
            .fetch_one(&self.pool)
            .await?;

        let pending_bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE status = ?1")
            .bind(BillStatus::Pending)
            .fetch_one(&self.pool)
            .await?;

        let month_begin = start_of_day(month_start(today));

        let month_revenue_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount_cents), 0)
            FROM sales
            WHERE status = ?1 AND created_at >= ?2
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(month_begin)
        .fetch_one(&self.pool)
        .await?;

        let month_expenses_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM bills
            WHERE status = ?1 AND paid_at >= ?2
            "#,
        )
        .bind(BillStatus::Paid)
        .bind(month_begin)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_revenue_cents,
            completed_sales,
            cancelled_sales,
            product_count,
            inventory_units,
            inventory_value_cents,
            low_stock_count,
            low_stock_threshold,
            pending_bills,
            month_revenue_cents,
            month_expenses_cents,
        })
    }

    /// Completed revenue per day for the last `days` days.
    pub async fn sales_trend(&self, today: NaiveDate, days: u32) -> DbResult<Series> {
        let Some(first) = daily_window(today, days).first().copied() else {
            return Ok(Series::default());
        };

        let points = self.completed_revenue_since(start_of_day(first)).await?;
        Ok(daily_series(today, days, &points))
    }

    /// Completed revenue against paid bills per month for the last
    /// `months` months.
    pub async fn revenue_expenses(&self, today: NaiveDate, months: u32) -> DbResult<RevenueExpenses> {
        let Some(first) = monthly_window(today, months).first().copied() else {
            return Ok(RevenueExpenses::default());
        };
        let since = start_of_day(first);

        let revenue = self.completed_revenue_since(since).await?;

        let expenses: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(
            r#"
            SELECT paid_at, amount_cents
            FROM bills
            WHERE status = ?1 AND paid_at >= ?2
            "#,
        )
        .bind(BillStatus::Paid)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        let expenses: Vec<(NaiveDate, i64)> = expenses
            .into_iter()
            .map(|(at, cents)| (at.date_naive(), cents))
            .collect();

        Ok(monthly_series(today, months, &revenue, &expenses))
    }

    /// Product count per category, ordered by category name.
    pub async fn category_distribution(&self) -> DbResult<Vec<CategoryCount>> {
        let counts = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM products
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Products at or below `threshold`, lowest stock first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{SELECT_PRODUCT} WHERE stock <= ?1 ORDER BY stock ASC, code ASC"
        ))
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn completed_revenue_since(&self, since: DateTime<Utc>) -> DbResult<Vec<(NaiveDate, i64)>> {
        let rows: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(
            r#"
            SELECT created_at, total_amount_cents
            FROM sales
            WHERE status = ?1 AND created_at >= ?2
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(at, cents)| (at.date_naive(), cents))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::{NewBill, NewProduct, NewSale, NewSaleItem};

    async fn product(db: &Database, code: &str, category: &str, stock: i64, price: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                code: code.to_string(),
                name: code.to_string(),
                category: category.to_string(),
                supplier: "Acme".to_string(),
                stock,
                unit_price_cents: price,
            })
            .await
            .unwrap()
    }

    async fn seeded() -> (Database, Product, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "A-001", "Beverages", 20, 100).await;
        let b = product(&db, "B-001", "Snacks", 5, 250).await;
        (db, a, b)
    }

    async fn sell(db: &Database, product: &Product, qty: i64) -> String {
        db.sales()
            .create_sale(&NewSale {
                customer_name: "Walk-in".to_string(),
                payment_method: "cash".to_string(),
                items: vec![NewSaleItem::new(&product.id, qty)],
            })
            .await
            .unwrap()
            .sale
            .id
    }

    #[tokio::test]
    async fn test_dashboard_stats_ignore_cancelled_revenue() {
        let (db, a, b) = seeded().await;
        sell(&db, &a, 3).await;
        let cancelled = sell(&db, &b, 1).await;
        db.sales().cancel_sale(&cancelled).await.unwrap();

        let bill = db
            .bills()
            .create(&NewBill {
                bill_type: "utilities".to_string(),
                amount_cents: 4_500,
                due_date: Utc::now().date_naive(),
                description: "Power".to_string(),
            })
            .await
            .unwrap();
        db.bills().create(&NewBill {
            bill_type: "rent".to_string(),
            amount_cents: 100_000,
            due_date: Utc::now().date_naive(),
            description: "Rent".to_string(),
        })
        .await
        .unwrap();
        db.bills().update_status(&bill.id, BillStatus::Paid).await.unwrap();

        let stats = db
            .reports()
            .dashboard_stats(10, Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(stats.total_revenue_cents, 300);
        assert_eq!(stats.completed_sales, 1);
        assert_eq!(stats.cancelled_sales, 1);
        assert_eq!(stats.product_count, 2);
        assert_eq!(stats.inventory_units, 17 + 5);
        assert_eq!(stats.inventory_value_cents, 17 * 100 + 5 * 250);
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.pending_bills, 1);
        assert_eq!(stats.month_revenue_cents, 300);
        assert_eq!(stats.month_expenses_cents, 4_500);
    }

    #[tokio::test]
    async fn test_sales_trend_today_bucket() {
        let (db, a, _) = seeded().await;
        sell(&db, &a, 2).await;
        sell(&db, &a, 1).await;

        let today = Utc::now().date_naive();
        let trend = db.reports().sales_trend(today, 7).await.unwrap();

        assert_eq!(trend.labels.len(), 7);
        assert_eq!(trend.data, vec![0, 0, 0, 0, 0, 0, 300]);
        assert_eq!(trend.labels[6], today.format("%a").to_string());
    }

    #[tokio::test]
    async fn test_revenue_expenses_current_month() {
        let (db, a, _) = seeded().await;
        sell(&db, &a, 5).await;

        let report = db
            .reports()
            .revenue_expenses(Utc::now().date_naive(), 6)
            .await
            .unwrap();

        assert_eq!(report.labels.len(), 6);
        assert_eq!(report.revenue.last(), Some(&500));
        assert_eq!(report.expenses.iter().sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn test_category_distribution_and_low_stock() {
        let (db, _, b) = seeded().await;

        let categories = db.reports().category_distribution().await.unwrap();
        assert_eq!(
            categories,
            vec![
                CategoryCount { category: "Beverages".to_string(), count: 1 },
                CategoryCount { category: "Snacks".to_string(), count: 1 },
            ]
        );

        let low = db.reports().low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, b.id);
        assert!(db.reports().low_stock(0).await.unwrap().is_empty());
    }
}

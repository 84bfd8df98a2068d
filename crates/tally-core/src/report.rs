//! # Report Shapes and Date Bucketing
//!
//! The dashboard reads committed rows through `tally-db` and hands them
//! here to be bucketed. Everything in this module is deterministic given
//! `today`, which keeps the window logic testable without a clock.
//!
//! ```text
//!   rows (date, cents) ──► daily_series(today, 7)    ──► Mon Tue ... Sun
//!                      └─► monthly_series(today, 6)  ──► May Jun ... Oct
//! ```
//!
//! Empty buckets are zero-filled so the frontend always gets `N` points.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use ts_rs::TS;

// =============================================================================
// Shapes
// =============================================================================

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    /// Revenue of completed sales, all time.
    pub total_revenue_cents: i64,
    pub completed_sales: i64,
    pub cancelled_sales: i64,
    pub product_count: i64,
    pub inventory_units: i64,
    pub inventory_value_cents: i64,
    pub low_stock_count: i64,
    pub low_stock_threshold: i64,
    pub pending_bills: i64,
    pub month_revenue_cents: i64,
    /// Paid bills in the current month.
    pub month_expenses_cents: i64,
}

/// One labelled series for a line/bar chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Series {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
}

/// Revenue against expenses per month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RevenueExpenses {
    pub labels: Vec<String>,
    pub revenue: Vec<i64>,
    pub expenses: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

// =============================================================================
// Windows
// =============================================================================

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The last `days` calendar days ending with `today`, oldest first.
pub fn daily_window(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
        .collect()
}

/// First days of the last `months` months ending with the current one,
/// oldest first.
pub fn monthly_window(today: NaiveDate, months: u32) -> Vec<NaiveDate> {
    let current = month_start(today);
    (0..months)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}

// =============================================================================
// Bucketing
// =============================================================================

/// Sums `points` into one bucket per day of the window.
///
/// Points outside the window are ignored. Labels are weekday short
/// names (`Mon`, `Tue`, ...).
pub fn daily_series(today: NaiveDate, days: u32, points: &[(NaiveDate, i64)]) -> Series {
    let window = daily_window(today, days);
    let mut data = vec![0i64; window.len()];

    for (date, cents) in points {
        if let Some(idx) = window.iter().position(|d| d == date) {
            data[idx] += cents;
        }
    }

    Series {
        labels: window.iter().map(|d| d.format("%a").to_string()).collect(),
        data,
    }
}

/// Sums revenue and expense points into one bucket per month of the
/// window. Labels are month short names (`Jan`, `Feb`, ...).
pub fn monthly_series(
    today: NaiveDate,
    months: u32,
    revenue: &[(NaiveDate, i64)],
    expenses: &[(NaiveDate, i64)],
) -> RevenueExpenses {
    let window = monthly_window(today, months);

    let bucket = |points: &[(NaiveDate, i64)]| {
        let mut data = vec![0i64; window.len()];
        for (date, cents) in points {
            let first = month_start(*date);
            if let Some(idx) = window.iter().position(|m| *m == first) {
                data[idx] += cents;
            }
        }
        data
    };

    RevenueExpenses {
        labels: window.iter().map(|d| d.format("%b").to_string()).collect(),
        revenue: bucket(revenue),
        expenses: bucket(expenses),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_window() {
        // 2026-10-19 is a Monday.
        let window = daily_window(date(2026, 10, 19), 7);
        assert_eq!(window.len(), 7);
        assert_eq!(window[0], date(2026, 10, 13));
        assert_eq!(window[6], date(2026, 10, 19));
    }

    #[test]
    fn test_daily_series_zero_fills_and_labels() {
        let today = date(2026, 10, 19);
        let series = daily_series(
            today,
            7,
            &[
                (date(2026, 10, 19), 300),
                (date(2026, 10, 19), 200),
                (date(2026, 10, 14), 100),
                (date(2026, 9, 1), 9999),
            ],
        );

        assert_eq!(
            series.labels,
            vec!["Tue", "Wed", "Thu", "Fri", "Sat", "Sun", "Mon"]
        );
        assert_eq!(series.data, vec![0, 100, 0, 0, 0, 0, 500]);
    }

    #[test]
    fn test_monthly_window_crosses_year() {
        let window = monthly_window(date(2026, 2, 15), 6);
        assert_eq!(window.first(), Some(&date(2025, 9, 1)));
        assert_eq!(window.last(), Some(&date(2026, 2, 1)));
    }

    #[test]
    fn test_monthly_series() {
        let report = monthly_series(
            date(2026, 10, 19),
            6,
            &[(date(2026, 10, 1), 300), (date(2026, 5, 31), 100)],
            &[(date(2026, 10, 5), 50), (date(2025, 10, 5), 999)],
        );

        assert_eq!(report.labels, vec!["May", "Jun", "Jul", "Aug", "Sep", "Oct"]);
        assert_eq!(report.revenue, vec![100, 0, 0, 0, 0, 300]);
        assert_eq!(report.expenses, vec![0, 0, 0, 0, 0, 50]);
    }

    #[test]
    fn test_start_of_day() {
        let start = start_of_day(date(2026, 10, 19));
        assert_eq!(start.to_rfc3339(), "2026-10-19T00:00:00+00:00");
    }
}

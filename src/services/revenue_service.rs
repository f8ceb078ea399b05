//! Revenue Service
//!
//! Paid new-sale order revenue, attributed to each member's latest lead.
//! Query failures are logged and yield empty results.

use crate::db::models::{RevenueDailyTrend, RevenueDetail, RevenueRecord};
use crate::db::sqlite::queries;
use crate::platforms::types::Platform;
use crate::services::metrics_service::round_to;
use crate::services::{fetch_rows, zero_filled};
use crate::state::AppState;
use crate::window::DateWindow;
use std::collections::BTreeMap;

/// Revenue service for business logic
pub struct RevenueService;

impl RevenueService {
    /// Order-level revenue rows, newest first
    ///
    /// Only members with an active sales representative are listed.
    pub async fn get_revenue(
        state: &AppState,
        window: &DateWindow,
        sources: &[Platform],
    ) -> Vec<RevenueDetail> {
        fetch_rows(
            state,
            "RevenueService::get_revenue",
            queries::REVENUE_QUERY,
            window,
            sources,
        )
        .await
    }

    /// Orders and revenue per `(source, utm_content)`, amounts at 2 decimals
    pub async fn get_revenue_summary_by_source_content(
        state: &AppState,
        window: &DateWindow,
        sources: &[Platform],
    ) -> Vec<RevenueRecord> {
        let records: Vec<RevenueRecord> = fetch_rows(
            state,
            "RevenueService::get_revenue_summary_by_source_content",
            queries::REVENUE_SUMMARY_BY_SOURCE_CONTENT,
            window,
            sources,
        )
        .await;

        records
            .into_iter()
            .map(|mut r| {
                r.total_revenue = round_to(r.total_revenue, 2);
                r.net_revenue = round_to(r.net_revenue, 2);
                r.avg_order_value = round_to(r.avg_order_value, 2);
                r
            })
            .collect()
    }

    /// Revenue per day and source, oldest first
    pub async fn get_revenue_daily_trend(
        state: &AppState,
        window: &DateWindow,
        sources: &[Platform],
    ) -> Vec<RevenueDailyTrend> {
        let trend: Vec<RevenueDailyTrend> = fetch_rows(
            state,
            "RevenueService::get_revenue_daily_trend",
            queries::REVENUE_DAILY_TREND,
            window,
            sources,
        )
        .await;

        trend
            .into_iter()
            .map(|mut t| {
                t.total_revenue = round_to(t.total_revenue, 2);
                t
            })
            .collect()
    }

    pub fn get_total_revenue(records: &[RevenueRecord]) -> f64 {
        records.iter().map(|r| r.total_revenue).sum()
    }

    /// Revenue per platform, with every platform in `platforms` present
    pub fn get_revenue_by_source(
        records: &[RevenueRecord],
        platforms: &[Platform],
    ) -> BTreeMap<Platform, f64> {
        zero_filled(platforms, records.iter().map(|r| (r.source, r.total_revenue)))
    }

    /// Orders per platform, with every platform in `platforms` present
    pub fn get_order_count_by_source(
        records: &[RevenueRecord],
        platforms: &[Platform],
    ) -> BTreeMap<Platform, i64> {
        zero_filled(platforms, records.iter().map(|r| (r.source, r.order_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded_state, test_state_with_backend, FailingExecutor, RowsExecutor};
    use serde_json::json;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn first_week() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        )
        .unwrap()
    }

    fn find<'a>(records: &'a [RevenueRecord], source: Platform, content: &str) -> Option<&'a RevenueRecord> {
        records
            .iter()
            .find(|r| r.source == source && r.utm_content == content)
    }

    #[tokio::test]
    async fn test_revenue_summary_filters_and_attribution() {
        let (_dir, state) = seeded_state();
        let records =
            RevenueService::get_revenue_summary_by_source_content(&state, &first_week(), &Platform::ALL)
                .await;

        // renewals, unpaid, zero-value and out-of-window orders are excluded
        assert_eq!(records.len(), 4);
        assert_eq!(RevenueService::get_total_revenue(&records), 760.0);

        let a = find(&records, Platform::Google, "A").unwrap();
        assert_eq!(a.order_count, 1);
        assert_eq!(a.total_revenue, 300.0);
        assert_eq!(a.net_revenue, 272.73);
        assert_eq!(a.avg_order_value, 300.0);

        // attributed through a lead older than the window
        assert_eq!(find(&records, Platform::Google, "D").unwrap().total_revenue, 150.0);

        assert_eq!(records[0].utm_content, "A");
    }

    #[tokio::test]
    async fn test_latest_lead_tie_breaks_on_highest_id() {
        let (_dir, state) = seeded_state();
        let records =
            RevenueService::get_revenue_summary_by_source_content(&state, &first_week(), &Platform::ALL)
                .await;

        assert!(find(&records, Platform::Google, "E1").is_none());
        assert_eq!(find(&records, Platform::Facebook, "E2").unwrap().total_revenue, 200.0);
    }

    #[tokio::test]
    async fn test_revenue_and_orders_by_source() {
        let (_dir, state) = seeded_state();
        let records = RevenueService::get_revenue_summary_by_source_content(
            &state,
            &first_week(),
            &[Platform::Google],
        )
        .await;

        let revenue = RevenueService::get_revenue_by_source(&records, &Platform::ALL);
        assert_eq!(revenue[&Platform::Google], 450.0);
        assert_eq!(revenue[&Platform::Facebook], 0.0);

        let orders = RevenueService::get_order_count_by_source(&records, &Platform::ALL);
        assert_eq!(orders[&Platform::Google], 2);
        assert_eq!(orders[&Platform::Facebook], 0);
    }

    #[tokio::test]
    async fn test_revenue_detail_requires_active_representative() {
        let (_dir, state) = seeded_state();
        let detail = RevenueService::get_revenue(&state, &first_week(), &Platform::ALL).await;

        let members: Vec<i64> = detail.iter().map(|d| d.member_id).collect();
        assert_eq!(members, vec![3, 1]);
        assert_eq!(detail[1].net_price, 272.73);
        assert_eq!(detail[1].product.as_deref(), Some("English A1"));
    }

    #[tokio::test]
    async fn test_revenue_daily_trend() {
        let (_dir, state) = seeded_state();
        let trend = RevenueService::get_revenue_daily_trend(&state, &first_week(), &Platform::ALL).await;

        assert_eq!(trend.len(), 4);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(trend[0].total_revenue, 150.0);
        let total: f64 = trend.iter().map(|t| t.total_revenue).sum();
        assert_eq!(total, 760.0);
    }

    #[tokio::test]
    async fn test_amounts_are_rounded_to_cents() {
        let summary_row = json!({
            "UtmSource": "google",
            "UtmContent": "A",
            "OrderCount": 3,
            "TotalRevenue": 0.1 + 0.2,
            "NetRevenue": 0.27272727,
            "AvgOrderValue": 0.30000000000000004 / 3.0,
        });
        let state = test_state_with_backend(Arc::new(RowsExecutor::new(vec![summary_row])));
        let records =
            RevenueService::get_revenue_summary_by_source_content(&state, &first_week(), &Platform::ALL)
                .await;
        assert_eq!(records[0].total_revenue, 0.3);
        assert_eq!(records[0].net_revenue, 0.27);
        assert_eq!(records[0].avg_order_value, 0.1);

        let trend_row = json!({
            "Date": "2024-03-02",
            "UtmSource": "facebook",
            "TotalRevenue": 100.1 + 200.2,
            "OrderCount": 2,
        });
        let state = test_state_with_backend(Arc::new(RowsExecutor::new(vec![trend_row])));
        let trend = RevenueService::get_revenue_daily_trend(&state, &first_week(), &Platform::ALL).await;
        assert_eq!(trend[0].total_revenue, 300.3);
    }

    #[tokio::test]
    async fn test_query_failure_yields_empty() {
        let state = test_state_with_backend(Arc::new(FailingExecutor));
        let records =
            RevenueService::get_revenue_summary_by_source_content(&state, &first_week(), &Platform::ALL)
                .await;
        assert!(records.is_empty());
        let by_source = RevenueService::get_revenue_by_source(&records, &Platform::ALL);
        assert!(by_source.values().all(|v| *v == 0.0));
    }
}

//! Lead Service
//!
//! Lead counts and trends from backend form submissions. Query failures are
//! logged and yield empty results.

use crate::db::models::{LeadDailyTrend, LeadDetail, LeadRecord};
use crate::db::sqlite::queries;
use crate::platforms::types::Platform;
use crate::services::{fetch_rows, zero_filled};
use crate::state::AppState;
use crate::window::DateWindow;
use std::collections::BTreeMap;

/// Lead service for business logic
pub struct LeadService;

impl LeadService {
    /// Individual lead rows, newest first
    pub async fn get_leads(
        state: &AppState,
        window: &DateWindow,
        sources: &[Platform],
    ) -> Vec<LeadDetail> {
        fetch_rows(state, "LeadService::get_leads", queries::LEAD_QUERY, window, sources).await
    }

    /// Distinct members per `(source, utm_content)`
    pub async fn get_lead_count_by_source_content(
        state: &AppState,
        window: &DateWindow,
        sources: &[Platform],
    ) -> Vec<LeadRecord> {
        fetch_rows(
            state,
            "LeadService::get_lead_count_by_source_content",
            queries::LEAD_COUNT_BY_SOURCE_CONTENT,
            window,
            sources,
        )
        .await
    }

    /// Distinct members per day and source, oldest first
    pub async fn get_lead_daily_trend(
        state: &AppState,
        window: &DateWindow,
        sources: &[Platform],
    ) -> Vec<LeadDailyTrend> {
        fetch_rows(
            state,
            "LeadService::get_lead_daily_trend",
            queries::LEAD_DAILY_TREND,
            window,
            sources,
        )
        .await
    }

    pub fn get_total_leads(records: &[LeadRecord]) -> i64 {
        records.iter().map(|r| r.lead_count).sum()
    }

    /// Leads per platform, with every platform in `platforms` present
    pub fn get_leads_by_source(
        records: &[LeadRecord],
        platforms: &[Platform],
    ) -> BTreeMap<Platform, i64> {
        zero_filled(platforms, records.iter().map(|r| (r.source, r.lead_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded_state, test_state_with_backend, FailingExecutor};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn march(first: u32, last: u32) -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 3, first).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, last).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_lead_count_by_source_content() {
        let (_dir, state) = seeded_state();
        let records =
            LeadService::get_lead_count_by_source_content(&state, &march(1, 7), &Platform::ALL)
                .await;

        let a = records
            .iter()
            .find(|r| r.source == Platform::Google && r.utm_content == "A")
            .unwrap();
        // member 1 submitted twice; counted once
        assert_eq!(a.lead_count, 2);
        assert_eq!(a.first_lead_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(a.last_lead_date, NaiveDate::from_ymd_opt(2024, 3, 7));

        // other brands and non-platform sources are excluded
        assert!(records.iter().all(|r| r.utm_content != "other-brand"));
        assert_eq!(LeadService::get_total_leads(&records), 5);
    }

    #[tokio::test]
    async fn test_window_is_inclusive() {
        let (_dir, state) = seeded_state();
        let last_day =
            LeadService::get_lead_count_by_source_content(&state, &march(7, 7), &Platform::ALL)
                .await;
        assert_eq!(LeadService::get_total_leads(&last_day), 1);

        let outside =
            LeadService::get_lead_count_by_source_content(&state, &march(20, 25), &Platform::ALL)
                .await;
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn test_leads_by_source_zero_fills() {
        let (_dir, state) = seeded_state();
        let records =
            LeadService::get_lead_count_by_source_content(&state, &march(1, 7), &[Platform::Google])
                .await;
        let by_source = LeadService::get_leads_by_source(&records, &Platform::ALL);
        assert_eq!(by_source.len(), 2);
        assert_eq!(by_source[&Platform::Facebook], 0);
        assert!(by_source[&Platform::Google] > 0);
    }

    #[tokio::test]
    async fn test_lead_detail_and_trend() {
        let (_dir, state) = seeded_state();
        let leads = LeadService::get_leads(&state, &march(1, 7), &Platform::ALL).await;
        assert_eq!(leads.len(), 6);
        assert!(leads.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert!(leads.iter().any(|l| l.utm_content.is_empty()));

        let trend = LeadService::get_lead_daily_trend(&state, &march(1, 7), &Platform::ALL).await;
        assert!(trend.windows(2).all(|w| w[0].date <= w[1].date));
        let total: i64 = trend.iter().map(|t| t.lead_count).sum();
        assert_eq!(total, 6);
    }

    #[tokio::test]
    async fn test_query_failure_yields_empty() {
        let state = test_state_with_backend(Arc::new(FailingExecutor));
        let records =
            LeadService::get_lead_count_by_source_content(&state, &march(1, 7), &Platform::ALL)
                .await;
        assert!(records.is_empty());
        assert_eq!(LeadService::get_total_leads(&records), 0);
    }
}

//! Services Layer
//!
//! Aggregation and metric logic called by the REST API handlers.
//!
//! # Architecture
//!
//! ```text
//! Ad platforms ──> AdSpendService ──┐
//! Backend DB ────> LeadService ─────┼──> MetricsService ──> REST API
//! Backend DB ────> RevenueService ──┘
//! ```
//!
//! # Services
//!
//! - `AdSpendService` - Fetch and aggregate ad spend across platforms
//! - `LeadService` - Lead counts and trends from the backend
//! - `RevenueService` - Attributed order revenue from the backend
//! - `MetricsService` - CPA / ROAS reconciliation, comparisons, dashboard cache
//!
//! Source-facing failures stop at the aggregator boundary: a failed
//! connector or query is logged and contributes nothing.

pub mod ad_spend_service;
pub mod lead_service;
pub mod revenue_service;
pub mod metrics_service;

pub use ad_spend_service::{AdSpendService, CampaignPerformance, ContentSpend, DailySpend};
pub use lead_service::LeadService;
pub use revenue_service::RevenueService;
pub use metrics_service::{
    DashboardSummary, MetricsService, OverallMetrics, PeriodComparison, ReconciledMetric,
    SourceMetrics,
};

use crate::db::{self, sqlite::queries};
use crate::platforms::types::Platform;
use crate::state::AppState;
use crate::window::DateWindow;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Run a backend template for the window and platforms
///
/// Any failure is logged under `name` and yields no rows.
pub(crate) async fn fetch_rows<T: DeserializeOwned>(
    state: &AppState,
    name: &str,
    template: &str,
    window: &DateWindow,
    sources: &[Platform],
) -> Vec<T> {
    if sources.is_empty() {
        return Vec::new();
    }

    let sql = queries::render(template, sources);
    let result = db::run_query(
        state.backend.clone(),
        sql,
        window.bind_params(),
        state.config.query_timeout(),
    )
    .await
    .and_then(db::rows_into::<T>);

    match result {
        Ok(rows) => {
            debug!("{}: {} rows for {}", name, rows.len(), window);
            rows
        }
        Err(e) => {
            error!("{} failed for {}: {}", name, window, e);
            Vec::new()
        }
    }
}

/// Sum values per platform, with a zero entry for every platform in `platforms`
pub(crate) fn zero_filled<V, I>(platforms: &[Platform], values: I) -> BTreeMap<Platform, V>
where
    V: Default + std::ops::AddAssign,
    I: IntoIterator<Item = (Platform, V)>,
{
    let mut totals: BTreeMap<Platform, V> =
        platforms.iter().map(|p| (*p, V::default())).collect();

    for (platform, value) in values {
        if let Some(total) = totals.get_mut(&platform) {
            *total += value;
        }
    }

    totals
}

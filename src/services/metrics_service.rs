//! Metrics Service
//!
//! Joins spend, lead and revenue aggregates on the `(source, content)`
//! attribution key and derives CPA and ROAS.
//!
//! Spend drives the content table: every spend key yields exactly one row and
//! lead or revenue keys without spend are dropped. Ratios with a zero
//! denominator are `0`. Money and ratios are rounded half-to-even to two
//! decimals on output.

use crate::db::models::{LeadRecord, RevenueRecord};
use crate::error::Result;
use crate::platforms::types::{Platform, SpendRecord, SpendSummary};
use crate::services::{AdSpendService, ContentSpend, LeadService, RevenueService};
use crate::state::AppState;
use crate::window::DateWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

// ============================================================================
// Metric Types
// ============================================================================

/// Spend, leads and revenue for one attribution key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledMetric {
    pub source: Platform,
    pub content: String,
    pub spend: f64,
    pub leads: i64,
    pub revenue: f64,
    pub cpa: f64,
    pub roas: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub total_spend: f64,
    pub total_leads: i64,
    pub total_revenue: f64,
    pub cpa: f64,
    pub roas: f64,
    pub roas_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetrics {
    pub spend: f64,
    pub leads: i64,
    pub revenue: f64,
    pub cpa: f64,
    pub roas: f64,
    pub roas_percentage: f64,
}

/// Overall metrics against the preceding window of equal length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current_window: DateWindow,
    pub previous_window: DateWindow,
    pub current: OverallMetrics,
    pub previous: OverallMetrics,
    /// Percent changes, `0` when the previous value is `0`
    pub spend_change: f64,
    pub leads_change: f64,
    pub revenue_change: f64,
}

/// Everything the dashboard page shows for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub window: DateWindow,
    pub platforms: Vec<Platform>,
    pub overall: OverallMetrics,
    pub by_source: BTreeMap<Platform, SourceMetrics>,
    pub by_content: Vec<ReconciledMetric>,
    pub spend_summary: BTreeMap<Platform, SpendSummary>,
    pub orders_by_source: BTreeMap<Platform, i64>,
    pub generated_at: DateTime<Utc>,
}

/// The three aggregates for one window
struct Aggregates {
    spend: Vec<SpendRecord>,
    leads: Vec<LeadRecord>,
    revenue: Vec<RevenueRecord>,
}

// ============================================================================
// Pure Computations
// ============================================================================

/// Round half-to-even to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Cost per acquisition, `0` without leads
pub fn cpa(spend: f64, leads: i64) -> f64 {
    if leads > 0 {
        spend / leads as f64
    } else {
        0.0
    }
}

/// Return on ad spend, `0` without spend
pub fn roas(revenue: f64, spend: f64) -> f64 {
    if spend > 0.0 {
        revenue / spend
    } else {
        0.0
    }
}

/// Percent change from `previous` to `current`, one decimal
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        round_to((current - previous) / previous * 100.0, 1)
    }
}

/// Join the aggregates on `(source, content)`, spend driving
///
/// Output is sorted by rounded ROAS, highest first; equal ROAS keeps the
/// order of `spend`.
pub fn reconcile_by_content(
    spend: &[ContentSpend],
    leads: &[LeadRecord],
    revenue: &[RevenueRecord],
) -> Vec<ReconciledMetric> {
    let mut lead_counts: HashMap<(Platform, &str), i64> = HashMap::new();
    for lead in leads {
        *lead_counts
            .entry((lead.source, lead.utm_content.as_str()))
            .or_default() += lead.lead_count;
    }

    let mut revenue_totals: HashMap<(Platform, &str), f64> = HashMap::new();
    for order in revenue {
        *revenue_totals
            .entry((order.source, order.utm_content.as_str()))
            .or_default() += order.total_revenue;
    }

    let mut metrics: Vec<ReconciledMetric> = spend
        .iter()
        .map(|row| {
            let key = (row.source, row.utm_content.as_str());
            let leads = lead_counts.get(&key).copied().unwrap_or(0);
            let revenue = revenue_totals.get(&key).copied().unwrap_or(0.0);

            ReconciledMetric {
                source: row.source,
                content: row.utm_content.clone(),
                spend: round_to(row.spend, 2),
                leads,
                revenue: round_to(revenue, 2),
                cpa: round_to(cpa(row.spend, leads), 2),
                roas: round_to(roas(revenue, row.spend), 2),
            }
        })
        .collect();

    metrics.sort_by(|a, b| b.roas.total_cmp(&a.roas));
    metrics
}

/// Totals and derived ratios
pub fn overall_metrics(total_spend: f64, total_leads: i64, total_revenue: f64) -> OverallMetrics {
    let ratio = roas(total_revenue, total_spend);
    OverallMetrics {
        total_spend: round_to(total_spend, 2),
        total_leads,
        total_revenue: round_to(total_revenue, 2),
        cpa: round_to(cpa(total_spend, total_leads), 2),
        roas: round_to(ratio, 2),
        roas_percentage: round_to(ratio * 100.0, 1),
    }
}

/// Per-platform metrics, with every platform in `platforms` present
pub fn source_metrics(
    spend: &BTreeMap<Platform, f64>,
    leads: &BTreeMap<Platform, i64>,
    revenue: &BTreeMap<Platform, f64>,
    platforms: &[Platform],
) -> BTreeMap<Platform, SourceMetrics> {
    platforms
        .iter()
        .map(|platform| {
            let overall = overall_metrics(
                spend.get(platform).copied().unwrap_or(0.0),
                leads.get(platform).copied().unwrap_or(0),
                revenue.get(platform).copied().unwrap_or(0.0),
            );
            (
                *platform,
                SourceMetrics {
                    spend: overall.total_spend,
                    leads: overall.total_leads,
                    revenue: overall.total_revenue,
                    cpa: overall.cpa,
                    roas: overall.roas,
                    roas_percentage: overall.roas_percentage,
                },
            )
        })
        .collect()
}

/// `₺1,234.50`
pub fn format_currency(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    format!("₺{}{}.{}", sign, grouped, fraction)
}

/// `%12.5`
pub fn format_percentage(value: f64) -> String {
    format!("%{:.1}", value)
}

// ============================================================================
// Service
// ============================================================================

/// Metrics service for business logic
pub struct MetricsService;

impl MetricsService {
    pub async fn calculate_overall_metrics(
        state: &AppState,
        window: &DateWindow,
        platforms: &[Platform],
    ) -> OverallMetrics {
        let data = Self::gather(state, window, platforms).await;
        Self::overall_from(&data)
    }

    pub async fn calculate_metrics_by_source(
        state: &AppState,
        window: &DateWindow,
        platforms: &[Platform],
    ) -> BTreeMap<Platform, SourceMetrics> {
        let data = Self::gather(state, window, platforms).await;
        Self::by_source_from(&data, platforms)
    }

    pub async fn calculate_metrics_by_content(
        state: &AppState,
        window: &DateWindow,
        platforms: &[Platform],
    ) -> Vec<ReconciledMetric> {
        let data = Self::gather(state, window, platforms).await;
        Self::by_content_from(&data)
    }

    /// Compare the window with the one immediately before it
    pub async fn calculate_period_comparison(
        state: &AppState,
        window: &DateWindow,
        platforms: &[Platform],
    ) -> Result<PeriodComparison> {
        let previous_window = window.previous()?;
        let (current, previous) = tokio::join!(
            Self::calculate_overall_metrics(state, window, platforms),
            Self::calculate_overall_metrics(state, &previous_window, platforms),
        );

        Ok(PeriodComparison {
            current_window: *window,
            previous_window,
            spend_change: percent_change(current.total_spend, previous.total_spend),
            leads_change: percent_change(current.total_leads as f64, previous.total_leads as f64),
            revenue_change: percent_change(current.total_revenue, previous.total_revenue),
            current,
            previous,
        })
    }

    /// Overall, per-source and per-content metrics from one fetch
    ///
    /// Summaries are cached per window and platform selection until
    /// [`MetricsService::refresh`], up to the configured cache capacity.
    pub async fn get_dashboard_summary(
        state: &AppState,
        window: &DateWindow,
        platforms: &[Platform],
    ) -> DashboardSummary {
        let key = (*window, platforms.to_vec());
        let cached = state.dashboard_cache.get(&key).map(|entry| entry.value().clone());
        if let Some(summary) = cached {
            return summary;
        }

        let data = Self::gather(state, window, platforms).await;
        let summary = DashboardSummary {
            window: *window,
            platforms: platforms.to_vec(),
            overall: Self::overall_from(&data),
            by_source: Self::by_source_from(&data, platforms),
            by_content: Self::by_content_from(&data),
            spend_summary: AdSpendService::get_platform_spend_summary(&data.spend, platforms),
            orders_by_source: RevenueService::get_order_count_by_source(&data.revenue, platforms),
            generated_at: Utc::now(),
        };

        state.cache_summary(key, summary.clone());
        summary
    }

    /// Clear cached summaries so the next request refetches
    pub fn refresh(state: &AppState) -> usize {
        let cleared = state.clear_cache();
        info!("MetricsService::refresh: cleared {} cached summaries", cleared);
        cleared
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    async fn gather(state: &AppState, window: &DateWindow, platforms: &[Platform]) -> Aggregates {
        let (spend, leads, revenue) = tokio::join!(
            AdSpendService::get_all_platform_data(state, window, platforms),
            LeadService::get_lead_count_by_source_content(state, window, platforms),
            RevenueService::get_revenue_summary_by_source_content(state, window, platforms),
        );

        Aggregates {
            spend,
            leads,
            revenue,
        }
    }

    fn overall_from(data: &Aggregates) -> OverallMetrics {
        overall_metrics(
            AdSpendService::get_total_spend(&data.spend),
            LeadService::get_total_leads(&data.leads),
            RevenueService::get_total_revenue(&data.revenue),
        )
    }

    fn by_source_from(data: &Aggregates, platforms: &[Platform]) -> BTreeMap<Platform, SourceMetrics> {
        source_metrics(
            &AdSpendService::get_spend_by_source(&data.spend, platforms),
            &LeadService::get_leads_by_source(&data.leads, platforms),
            &RevenueService::get_revenue_by_source(&data.revenue, platforms),
            platforms,
        )
    }

    fn by_content_from(data: &Aggregates) -> Vec<ReconciledMetric> {
        reconcile_by_content(
            &AdSpendService::get_spend_by_content(&data.spend),
            &data.leads,
            &data.revenue,
        )
    }
}

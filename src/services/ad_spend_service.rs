//! Ad Spend Service
//!
//! Fetches campaign spend from every selected platform and builds the
//! spend-side aggregates. A platform that errors, times out or returns
//! nothing is left out of the union.

use crate::platforms::types::{Platform, SpendRecord, SpendSummary};
use crate::platforms::AdPlatform;
use crate::services::metrics_service::round_to;
use crate::services::zero_filled;
use crate::state::AppState;
use crate::window::DateWindow;
use chrono::NaiveDate;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Spend totals for one attribution key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSpend {
    pub source: Platform,
    pub utm_content: String,
    pub spend: f64,
    pub clicks: i64,
    pub impressions: i64,
    pub conversions: i64,
}

/// Spend for one day on one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub source: Platform,
    pub spend: f64,
    pub clicks: i64,
    pub impressions: i64,
    pub conversions: i64,
}

/// Delivery and cost figures for one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPerformance {
    pub source: Platform,
    pub campaign_name: String,
    pub utm_content: String,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    /// Click-through rate in percent
    pub ctr: f64,
    /// Cost per click
    pub cpc: f64,
}

/// Ad spend service for business logic
pub struct AdSpendService;

impl AdSpendService {
    /// Fetch spend from the selected platforms concurrently
    ///
    /// Records are grouped by platform in `platforms` order and keep each
    /// connector's row order.
    pub async fn get_all_platform_data(
        state: &AppState,
        window: &DateWindow,
        platforms: &[Platform],
    ) -> Vec<SpendRecord> {
        let connectors: Vec<Arc<dyn AdPlatform>> = platforms
            .iter()
            .filter_map(|p| {
                let connector = state.platforms.get(*p);
                if connector.is_none() {
                    warn!("No connector registered for {}", p);
                }
                connector
            })
            .collect();

        let timeout = state.config.platform_timeout();
        let fetches = connectors
            .iter()
            .map(|connector| Self::fetch_platform(connector.as_ref(), window, timeout));

        let records: Vec<SpendRecord> = join_all(fetches).await.into_iter().flatten().collect();

        info!(
            "AdSpendService::get_all_platform_data: {} rows from {} platforms for {}",
            records.len(),
            connectors.len(),
            window
        );
        records
    }

    /// Sum of spend, `0` when empty
    pub fn get_total_spend(records: &[SpendRecord]) -> f64 {
        records.iter().map(|r| r.spend).sum()
    }

    /// Spend per platform, with every platform in `platforms` present
    pub fn get_spend_by_source(
        records: &[SpendRecord],
        platforms: &[Platform],
    ) -> BTreeMap<Platform, f64> {
        zero_filled(platforms, records.iter().map(|r| (r.source, r.spend)))
    }

    /// Spend per `(source, utm_content)`, highest spend first
    ///
    /// Equal spend keeps ascending `(source, utm_content)` string order.
    pub fn get_spend_by_content(records: &[SpendRecord]) -> Vec<ContentSpend> {
        let mut grouped: BTreeMap<(&str, &str), ContentSpend> = BTreeMap::new();

        for record in records {
            let entry = grouped
                .entry((record.source.as_str(), record.utm_content.as_str()))
                .or_insert_with(|| ContentSpend {
                    source: record.source,
                    utm_content: record.utm_content.clone(),
                    spend: 0.0,
                    clicks: 0,
                    impressions: 0,
                    conversions: 0,
                });
            entry.spend += record.spend;
            entry.clicks += record.clicks;
            entry.impressions += record.impressions;
            entry.conversions += record.conversions;
        }

        let mut content: Vec<ContentSpend> = grouped.into_values().collect();
        content.sort_by(|a, b| b.spend.total_cmp(&a.spend));
        content
    }

    /// Spend per day and platform, oldest first
    pub fn get_daily_spend(records: &[SpendRecord]) -> Vec<DailySpend> {
        let mut grouped: BTreeMap<(NaiveDate, Platform), DailySpend> = BTreeMap::new();

        for record in records {
            let entry = grouped
                .entry((record.date, record.source))
                .or_insert_with(|| DailySpend {
                    date: record.date,
                    source: record.source,
                    spend: 0.0,
                    clicks: 0,
                    impressions: 0,
                    conversions: 0,
                });
            entry.spend += record.spend;
            entry.clicks += record.clicks;
            entry.impressions += record.impressions;
            entry.conversions += record.conversions;
        }

        grouped
            .into_values()
            .map(|mut day| {
                day.spend = round_to(day.spend, 2);
                day
            })
            .collect()
    }

    /// Per-campaign totals with CTR and CPC, highest spend first
    pub fn get_campaign_performance(records: &[SpendRecord]) -> Vec<CampaignPerformance> {
        let mut grouped: BTreeMap<(Platform, &str, &str), CampaignPerformance> = BTreeMap::new();

        for record in records {
            let entry = grouped
                .entry((
                    record.source,
                    record.campaign_name.as_str(),
                    record.utm_content.as_str(),
                ))
                .or_insert_with(|| CampaignPerformance {
                    source: record.source,
                    campaign_name: record.campaign_name.clone(),
                    utm_content: record.utm_content.clone(),
                    spend: 0.0,
                    impressions: 0,
                    clicks: 0,
                    conversions: 0,
                    ctr: 0.0,
                    cpc: 0.0,
                });
            entry.spend += record.spend;
            entry.impressions += record.impressions;
            entry.clicks += record.clicks;
            entry.conversions += record.conversions;
        }

        let mut campaigns: Vec<CampaignPerformance> = grouped
            .into_values()
            .map(|mut c| {
                c.ctr = if c.impressions > 0 {
                    round_to(c.clicks as f64 / c.impressions as f64 * 100.0, 2)
                } else {
                    0.0
                };
                c.cpc = if c.clicks > 0 {
                    round_to(c.spend / c.clicks as f64, 2)
                } else {
                    0.0
                };
                c.spend = round_to(c.spend, 2);
                c
            })
            .collect();

        campaigns.sort_by(|a, b| b.spend.total_cmp(&a.spend));
        campaigns
    }

    /// Spend, clicks, impressions and conversions per platform
    pub fn get_platform_spend_summary(
        records: &[SpendRecord],
        platforms: &[Platform],
    ) -> BTreeMap<Platform, SpendSummary> {
        platforms
            .iter()
            .map(|platform| {
                let own: Vec<SpendRecord> = records
                    .iter()
                    .filter(|r| r.source == *platform)
                    .cloned()
                    .collect();
                let mut summary = SpendSummary::from_records(&own);
                summary.total_spend = round_to(summary.total_spend, 2);
                (*platform, summary)
            })
            .collect()
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    async fn fetch_platform(
        connector: &dyn AdPlatform,
        window: &DateWindow,
        timeout: std::time::Duration,
    ) -> Vec<SpendRecord> {
        match tokio::time::timeout(timeout, connector.fetch_campaign_data(window)).await {
            Ok(Ok(records)) => {
                if records.is_empty() {
                    warn!("{} returned no spend rows for {}", connector.name(), window);
                }
                records
            }
            Ok(Err(e)) => {
                error!("{} fetch failed: {}", connector.name(), e);
                Vec::new()
            }
            Err(_) => {
                error!(
                    "{} fetch timed out after {}s",
                    connector.name(),
                    timeout.as_secs()
                );
                Vec::new()
            }
        }
    }
}

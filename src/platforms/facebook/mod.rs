//! Facebook Ads connector
//!
//! Reads campaign-level daily insights from the Graph API Marketing
//! endpoints and follows cursor pagination until exhausted.

use crate::config::FacebookAdsConfig;
use crate::error::{AppError, Result};
use crate::platforms::types::*;
use crate::platforms::utm::extract_utm_content;
use crate::platforms::AdPlatform;
use crate::window::DateWindow;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Action types counted as conversions
const CONVERSION_ACTIONS: [&str; 4] = ["purchase", "lead", "complete_registration", "omni_purchase"];

/// Upper bound on followed `paging.next` links per fetch
const MAX_PAGES: usize = 200;

/// Facebook Ads connector implementation
pub struct FacebookAdsPlatform {
    client: Client,
    config: FacebookAdsConfig,
}

impl FacebookAdsPlatform {
    pub fn new(config: FacebookAdsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            config,
        })
    }

    fn insights_query(window: &DateWindow, access_token: &str) -> Vec<(&'static str, String)> {
        let time_range = serde_json::json!({
            "since": window.start.format("%Y-%m-%d").to_string(),
            "until": window.end.format("%Y-%m-%d").to_string(),
        });

        vec![
            (
                "fields",
                "date_start,campaign_id,campaign_name,spend,impressions,clicks,actions".to_string(),
            ),
            ("level", "campaign".to_string()),
            ("time_increment", "1".to_string()),
            ("time_range", time_range.to_string()),
            ("limit", "500".to_string()),
            ("access_token", access_token.to_string()),
        ]
    }

    async fn get_page(&self, request: reqwest::RequestBuilder) -> Result<InsightsPage> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            #[derive(Deserialize)]
            struct ErrorBody {
                error: Option<GraphError>,
            }

            #[derive(Deserialize)]
            struct GraphError {
                message: Option<String>,
                fbtrace_id: Option<String>,
            }

            let body: Option<ErrorBody> = response.json().await.ok();
            let (message, trace) = body
                .and_then(|b| b.error)
                .map(|e| (e.message, e.fbtrace_id))
                .unwrap_or((None, None));

            return Err(AppError::Platform(format!(
                "Facebook Graph API error ({}): {}{}",
                status,
                message.unwrap_or_else(|| "unknown error".to_string()),
                trace.map(|t| format!(" [fbtrace_id {}]", t)).unwrap_or_default(),
            )));
        }

        Ok(response.json().await?)
    }

    /// Turn insight rows into spend records
    fn parse_insights(rows: Vec<Insight>) -> Vec<SpendRecord> {
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let date = match NaiveDate::parse_from_str(&row.date_start, "%Y-%m-%d") {
                Ok(date) => date,
                Err(e) => {
                    warn!("Skipping Facebook insight with bad date '{}': {}", row.date_start, e);
                    continue;
                }
            };

            let conversions = row
                .actions
                .iter()
                .filter(|a| CONVERSION_ACTIONS.contains(&a.action_type.as_str()))
                .map(|a| a.value as i64)
                .sum();

            records.push(SpendRecord {
                date,
                source: Platform::Facebook,
                campaign_id: row.campaign_id,
                utm_content: extract_utm_content(&row.campaign_name),
                campaign_name: row.campaign_name,
                spend: row.spend,
                impressions: row.impressions,
                clicks: row.clicks,
                conversions,
            });
        }

        records
    }
}

#[async_trait]
impl AdPlatform for FacebookAdsPlatform {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn fetch_campaign_data(&self, window: &DateWindow) -> Result<Vec<SpendRecord>> {
        let access_token = self
            .config
            .access_token
            .as_deref()
            .ok_or_else(|| AppError::Config("Facebook access token is not configured".to_string()))?;
        let account_id = self
            .config
            .ad_account_id
            .as_deref()
            .ok_or_else(|| AppError::Config("Facebook ad account id is not configured".to_string()))?;

        let first = self
            .client
            .get(format!("{}/{}/insights", BASE_URL, account_id))
            .query(&Self::insights_query(window, access_token));

        let mut page = self.get_page(first).await?;
        let mut rows = std::mem::take(&mut page.data);
        let mut pages = 1;

        while let Some(next) = page.paging.and_then(|p| p.next) {
            if pages >= MAX_PAGES {
                warn!("Facebook insights pagination stopped after {} pages", pages);
                break;
            }
            debug!("Fetching Facebook insights page {}", pages + 1);
            page = self.get_page(self.client.get(next)).await?;
            rows.append(&mut page.data);
            pages += 1;
        }

        let records = Self::parse_insights(rows);

        if records.is_empty() {
            warn!("Facebook Ads returned no rows for {}", window);
        } else {
            info!("Facebook Ads: fetched {} rows", records.len());
        }

        Ok(records)
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct InsightsPage {
    #[serde(default)]
    data: Vec<Insight>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Insight {
    date_start: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    campaign_id: String,
    #[serde(default)]
    campaign_name: String,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    spend: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_i64")]
    impressions: i64,
    #[serde(default, deserialize_with = "deserialize_flexible_i64")]
    clicks: i64,
    #[serde(default)]
    actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
struct Action {
    action_type: String,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    value: f64,
}

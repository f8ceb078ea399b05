//! Google Ads connector
//!
//! Uses the Google Ads REST interface: an OAuth refresh-token exchange
//! followed by a `googleAds:searchStream` GAQL query at ad level, so the
//! destination URL of each ad can carry the `utm_content` value.

use crate::config::GoogleAdsConfig;
use crate::error::{AppError, Result};
use crate::platforms::types::*;
use crate::platforms::utm::{extract_utm_content, extract_utm_content_from_url};
use crate::platforms::AdPlatform;
use crate::window::DateWindow;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const API_BASE_URL: &str = "https://googleads.googleapis.com/v17";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh the access token this long before Google expires it
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Cached OAuth access token
struct AccessToken {
    token: String,
    expires_at: Instant,
}

/// Google Ads connector implementation
pub struct GoogleAdsPlatform {
    client: Client,
    config: GoogleAdsConfig,
    token: Mutex<Option<AccessToken>>,
}

/// Credentials required for a request, all present
struct Credentials<'a> {
    developer_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    customer_id: &'a str,
}

impl GoogleAdsPlatform {
    pub fn new(config: GoogleAdsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            config,
            token: Mutex::new(None),
        })
    }

    fn credentials(&self) -> Result<Credentials<'_>> {
        let missing = |name: &str| AppError::Config(format!("Google Ads {} is not configured", name));

        Ok(Credentials {
            developer_token: self
                .config
                .developer_token
                .as_deref()
                .ok_or_else(|| missing("developer token"))?,
            client_id: self.config.client_id.as_deref().ok_or_else(|| missing("client id"))?,
            client_secret: self
                .config
                .client_secret
                .as_deref()
                .ok_or_else(|| missing("client secret"))?,
            refresh_token: self
                .config
                .refresh_token
                .as_deref()
                .ok_or_else(|| missing("refresh token"))?,
            customer_id: self.config.customer_id.as_deref().ok_or_else(|| missing("customer id"))?,
        })
    }

    /// Exchange the refresh token for an access token, reusing a live one
    async fn access_token(&self, creds: &Credentials<'_>) -> Result<String> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|t| t.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN)
            .map(|t| t.token.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let params = [
            ("client_id", creds.client_id),
            ("client_secret", creds.client_secret),
            ("refresh_token", creds.refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.client.post(TOKEN_URL).form(&params).send().await?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
            expires_in: Option<u64>,
            error: Option<String>,
            error_description: Option<String>,
        }

        let result: TokenResponse = response.json().await?;

        let token = match result.access_token {
            Some(token) => token,
            None => {
                return Err(AppError::Platform(format!(
                    "Google OAuth token refresh failed: {}",
                    result
                        .error_description
                        .or(result.error)
                        .unwrap_or_else(|| "no access token in response".to_string())
                )))
            }
        };

        let expires_at = Instant::now() + Duration::from_secs(result.expires_in.unwrap_or(3600));
        *self.token.lock() = Some(AccessToken {
            token: token.clone(),
            expires_at,
        });

        Ok(token)
    }

    /// GAQL query for ad-level daily metrics inside the window
    pub fn build_query(window: &DateWindow) -> String {
        format!(
            r#"
            SELECT
                segments.date,
                campaign.name,
                campaign.id,
                ad_group.name,
                ad_group_ad.ad.final_urls,
                metrics.cost_micros,
                metrics.impressions,
                metrics.clicks,
                metrics.conversions
            FROM ad_group_ad
            WHERE segments.date BETWEEN '{}' AND '{}'
              AND campaign.status != 'REMOVED'
              AND ad_group.status != 'REMOVED'
              AND ad_group_ad.status != 'REMOVED'
            ORDER BY segments.date ASC
            "#,
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d"),
        )
    }

    /// Turn searchStream batches into spend records
    fn parse_stream(batches: Vec<StreamBatch>) -> Vec<SpendRecord> {
        let mut records = Vec::new();

        for row in batches.into_iter().flat_map(|b| b.results) {
            let date = match NaiveDate::parse_from_str(&row.segments.date, "%Y-%m-%d") {
                Ok(date) => date,
                Err(e) => {
                    warn!("Skipping Google Ads row with bad date '{}': {}", row.segments.date, e);
                    continue;
                }
            };

            let final_url = row
                .ad_group_ad
                .ad
                .final_urls
                .first()
                .map(String::as_str)
                .unwrap_or_default();

            let mut utm_content = extract_utm_content_from_url(final_url);
            if utm_content.is_empty() {
                utm_content = extract_utm_content(&row.campaign.name);
            }

            records.push(SpendRecord {
                date,
                source: Platform::Google,
                campaign_id: row.campaign.id,
                campaign_name: row.campaign.name,
                utm_content,
                spend: row.metrics.cost_micros as f64 / 1_000_000.0,
                impressions: row.metrics.impressions,
                clicks: row.metrics.clicks,
                conversions: row.metrics.conversions.round() as i64,
            });
        }

        records
    }
}

#[async_trait]
impl AdPlatform for GoogleAdsPlatform {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    async fn fetch_campaign_data(&self, window: &DateWindow) -> Result<Vec<SpendRecord>> {
        let creds = self.credentials()?;
        let access_token = self.access_token(&creds).await?;

        let mut request = self
            .client
            .post(format!(
                "{}/customers/{}/googleAds:searchStream",
                API_BASE_URL, creds.customer_id
            ))
            .bearer_auth(&access_token)
            .header("developer-token", creds.developer_token)
            .json(&serde_json::json!({ "query": Self::build_query(window) }));

        if let Some(login_customer_id) = self.config.login_customer_id.as_deref() {
            request = request.header("login-customer-id", login_customer_id);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Platform(format!(
                "Google Ads API error ({}): {}",
                status,
                api_error_message(&body)
            )));
        }

        let batches: Vec<StreamBatch> = response.json().await?;
        let records = Self::parse_stream(batches);

        if records.is_empty() {
            warn!("Google Ads returned no rows for {}", window);
        } else {
            info!("Google Ads: fetched {} rows", records.len());
        }

        Ok(records)
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StreamBatch {
    #[serde(default)]
    results: Vec<GoogleAdsRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAdsRow {
    segments: Segments,
    #[serde(default)]
    campaign: Campaign,
    #[serde(default)]
    ad_group_ad: AdGroupAd,
    #[serde(default)]
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
struct Segments {
    date: String,
}

#[derive(Debug, Default, Deserialize)]
struct Campaign {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AdGroupAd {
    #[serde(default)]
    ad: Ad,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ad {
    #[serde(default)]
    final_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metrics {
    #[serde(default, deserialize_with = "deserialize_flexible_i64")]
    cost_micros: i64,
    #[serde(default, deserialize_with = "deserialize_flexible_i64")]
    impressions: i64,
    #[serde(default, deserialize_with = "deserialize_flexible_i64")]
    clicks: i64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    conversions: f64,
}

/// Best-effort message from a Google API error body (object or stream array)
fn api_error_message(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return body.chars().take(500).collect(),
    };

    let error = match &value {
        serde_json::Value::Array(items) => items.first().and_then(|v| v.get("error")),
        other => other.get("error"),
    };

    error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(500).collect())
}

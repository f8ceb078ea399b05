//! Application configuration
//!
//! Assembled from environment variables with defaults, then validated once
//! at startup. `from_lookup` takes any key lookup so tests never touch the
//! process environment.

use crate::error::{AppError, Result};
use crate::platforms::types::{parse_platform_list, Platform};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

/// Backend database settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub pool_size: u32,
    pub query_timeout_secs: u64,
    /// Create the backend tables when they are missing
    pub init_schema: bool,
}

/// Dashboard API server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Google Ads API credentials
#[derive(Debug, Clone, Default)]
pub struct GoogleAdsConfig {
    pub developer_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub customer_id: Option<String>,
    pub login_customer_id: Option<String>,
}

impl GoogleAdsConfig {
    pub fn is_configured(&self) -> bool {
        self.developer_token.is_some()
            && self.client_id.is_some()
            && self.client_secret.is_some()
            && self.refresh_token.is_some()
            && self.customer_id.is_some()
    }
}

/// Facebook Marketing API credentials
#[derive(Debug, Clone, Default)]
pub struct FacebookAdsConfig {
    pub access_token: Option<String>,
    pub ad_account_id: Option<String>,
}

impl FacebookAdsConfig {
    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() && self.ad_account_id.is_some()
    }
}

/// Metric computation settings
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Enabled platforms; also the zero-fill key set of per-source metrics
    pub platforms: Vec<Platform>,
    pub default_range_days: i64,
    pub timezone: Tz,
    pub platform_timeout_secs: u64,
    /// Most dashboard summaries held in memory at once
    pub cache_capacity: usize,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub google_ads: GoogleAdsConfig,
    pub facebook_ads: FacebookAdsConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let platforms = match get("SUPPORTED_PLATFORMS") {
            Some(raw) => parse_platform_list(&raw)
                .map_err(|e| AppError::Config(format!("SUPPORTED_PLATFORMS: {}", e)))?,
            None => Platform::ALL.to_vec(),
        };

        let timezone = match get("DASHBOARD_TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|e| AppError::Config(format!("DASHBOARD_TIMEZONE: {}", e)))?,
            None => chrono_tz::Europe::Istanbul,
        };

        let config = Self {
            database: DatabaseConfig {
                path: get("DASHBOARD_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("marketing.db")),
                pool_size: parse_or(get("DB_POOL_SIZE"), "DB_POOL_SIZE", 4)?,
                query_timeout_secs: parse_or(get("DB_QUERY_TIMEOUT_SECS"), "DB_QUERY_TIMEOUT_SECS", 30)?,
                init_schema: parse_bool(get("DB_INIT_SCHEMA"), "DB_INIT_SCHEMA")?,
            },
            server: ServerConfig {
                host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parse_or(get("SERVER_PORT"), "SERVER_PORT", 8501)?,
            },
            google_ads: GoogleAdsConfig {
                developer_token: get("GOOGLE_ADS_DEVELOPER_TOKEN"),
                client_id: get("GOOGLE_ADS_CLIENT_ID"),
                client_secret: get("GOOGLE_ADS_CLIENT_SECRET"),
                refresh_token: get("GOOGLE_ADS_REFRESH_TOKEN"),
                customer_id: get("GOOGLE_ADS_CUSTOMER_ID").map(|id| id.replace('-', "")),
                login_customer_id: get("GOOGLE_ADS_LOGIN_CUSTOMER_ID").map(|id| id.replace('-', "")),
            },
            facebook_ads: FacebookAdsConfig {
                access_token: get("FB_ACCESS_TOKEN"),
                ad_account_id: get("FB_AD_ACCOUNT_ID").map(|id| {
                    if id.starts_with("act_") {
                        id
                    } else {
                        format!("act_{}", id)
                    }
                }),
            },
            dashboard: DashboardConfig {
                platforms,
                default_range_days: parse_or(get("DEFAULT_DATE_RANGE_DAYS"), "DEFAULT_DATE_RANGE_DAYS", 7)?,
                timezone,
                platform_timeout_secs: parse_or(get("PLATFORM_TIMEOUT_SECS"), "PLATFORM_TIMEOUT_SECS", 30)?,
                cache_capacity: parse_or(get("DASHBOARD_CACHE_CAPACITY"), "DASHBOARD_CACHE_CAPACITY", 128)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Enabled platforms whose credentials are incomplete
    pub fn unconfigured_platforms(&self) -> Vec<Platform> {
        self.dashboard
            .platforms
            .iter()
            .copied()
            .filter(|platform| match platform {
                Platform::Google => !self.google_ads.is_configured(),
                Platform::Facebook => !self.facebook_ads.is_configured(),
            })
            .collect()
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.platforms.is_empty() {
            return Err(AppError::Config("At least one platform must be enabled".to_string()));
        }
        if self.dashboard.cache_capacity == 0 {
            return Err(AppError::Config(
                "DASHBOARD_CACHE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.database.pool_size == 0 {
            return Err(AppError::Config("DB_POOL_SIZE must be at least 1".to_string()));
        }
        if self.dashboard.default_range_days <= 0 {
            return Err(AppError::Config(
                "DEFAULT_DATE_RANGE_DAYS must be positive".to_string(),
            ));
        }
        if self.database.query_timeout_secs == 0 || self.dashboard.platform_timeout_secs == 0 {
            return Err(AppError::Config("Timeouts must be at least one second".to_string()));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.database.query_timeout_secs)
    }

    pub fn platform_timeout(&self) -> Duration {
        Duration::from_secs(self.dashboard.platform_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .parse()
            .map_err(|e| AppError::Config(format!("{}: invalid value '{}': {}", key, v, e))),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<String>, key: &str) -> Result<bool> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(AppError::Config(format!("{}: invalid boolean '{}'", key, other))),
    }
}

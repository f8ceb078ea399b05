//! Application state management

use crate::config::AppConfig;
use crate::db::sqlite::SqliteBackend;
use crate::db::QueryExecutor;
use crate::error::{AppError, Result};
use crate::platforms::types::Platform;
use crate::platforms::PlatformRegistry;
use crate::services::metrics_service::DashboardSummary;
use crate::window::DateWindow;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Dashboard cache key: window and the selected platforms
pub type DashboardCacheKey = (DateWindow, Vec<Platform>);

/// Application state shared across all request handlers
pub struct AppState {
    pub config: AppConfig,

    /// Backend query executor
    pub backend: Arc<dyn QueryExecutor>,

    /// Enabled ad platform connectors
    pub platforms: Arc<PlatformRegistry>,

    /// Computed dashboard summaries, kept until the next refresh or until
    /// evicted by capacity
    pub dashboard_cache: DashMap<DashboardCacheKey, DashboardSummary>,

    /// Time of the last explicit refresh
    pub last_refreshed: RwLock<Option<DateTime<Utc>>>,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let backend = SqliteBackend::new(&config.database)?;
        let platforms = PlatformRegistry::new(&config)?;

        for connector in platforms.list() {
            tracing::info!("Registered ad platform: {}", connector.name());
        }
        for platform in config.unconfigured_platforms() {
            tracing::warn!(
                "{} credentials are incomplete; its spend will be empty until configured",
                platform
            );
        }

        Ok(Self::from_parts(config, Arc::new(backend), Arc::new(platforms)))
    }

    /// Assemble state from ready-made parts
    pub fn from_parts(
        config: AppConfig,
        backend: Arc<dyn QueryExecutor>,
        platforms: Arc<PlatformRegistry>,
    ) -> Self {
        Self {
            config,
            backend,
            platforms,
            dashboard_cache: DashMap::new(),
            last_refreshed: RwLock::new(None),
        }
    }

    /// Platforms enabled in configuration
    pub fn supported_platforms(&self) -> &[Platform] {
        &self.config.dashboard.platforms
    }

    /// Narrow a requested platform filter to the enabled platforms
    ///
    /// An empty request selects every enabled platform. The result keeps the
    /// configured order.
    pub fn select_platforms(&self, requested: &[Platform]) -> Result<Vec<Platform>> {
        if let Some(disabled) = requested
            .iter()
            .find(|p| !self.supported_platforms().contains(p))
        {
            return Err(AppError::Validation(format!(
                "Platform '{}' is not enabled",
                disabled
            )));
        }

        Ok(self
            .supported_platforms()
            .iter()
            .copied()
            .filter(|p| requested.is_empty() || requested.contains(p))
            .collect())
    }

    /// Cache a summary, evicting the oldest one when at capacity
    pub fn cache_summary(&self, key: DashboardCacheKey, summary: DashboardSummary) {
        if !self.dashboard_cache.contains_key(&key)
            && self.dashboard_cache.len() >= self.config.dashboard.cache_capacity
        {
            let oldest = self
                .dashboard_cache
                .iter()
                .min_by_key(|entry| entry.value().generated_at)
                .map(|entry| entry.key().clone());
            if let Some(oldest) = oldest {
                self.dashboard_cache.remove(&oldest);
                tracing::debug!("Evicted dashboard summary for {}", oldest.0);
            }
        }
        self.dashboard_cache.insert(key, summary);
    }

    /// Drop every cached dashboard summary
    pub fn clear_cache(&self) -> usize {
        let cleared = self.dashboard_cache.len();
        self.dashboard_cache.clear();
        *self.last_refreshed.write() = Some(Utc::now());
        cleared
    }
}

//! Ad platform connectors module

pub mod types;
pub mod utm;
pub mod google;
pub mod facebook;

use crate::config::AppConfig;
use crate::error::Result;
use crate::window::DateWindow;
use async_trait::async_trait;
use std::sync::Arc;
use types::*;

/// Trait that every ad platform connector implements
#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Platform this connector reports for
    fn platform(&self) -> Platform;

    /// Platform display name
    fn name(&self) -> &'static str {
        self.platform().display_name()
    }

    /// Fetch daily campaign spend for the window
    async fn fetch_campaign_data(&self, window: &DateWindow) -> Result<Vec<SpendRecord>>;
}

/// Registry of the enabled connectors, in configuration order
pub struct PlatformRegistry {
    platforms: Vec<Arc<dyn AdPlatform>>,
}

impl PlatformRegistry {
    /// Create a registry with a connector for every enabled platform
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut platforms: Vec<Arc<dyn AdPlatform>> = Vec::new();

        for platform in &config.dashboard.platforms {
            let connector: Arc<dyn AdPlatform> = match platform {
                Platform::Google => Arc::new(google::GoogleAdsPlatform::new(
                    config.google_ads.clone(),
                    config.platform_timeout(),
                )?),
                Platform::Facebook => Arc::new(facebook::FacebookAdsPlatform::new(
                    config.facebook_ads.clone(),
                    config.platform_timeout(),
                )?),
            };
            platforms.push(connector);
        }

        Ok(Self { platforms })
    }

    /// Create a registry from ready-made connectors
    pub fn from_platforms(platforms: Vec<Arc<dyn AdPlatform>>) -> Self {
        Self { platforms }
    }

    /// Get connector by platform
    pub fn get(&self, platform: Platform) -> Option<Arc<dyn AdPlatform>> {
        self.platforms
            .iter()
            .find(|p| p.platform() == platform)
            .cloned()
    }

    /// List all registered connectors
    pub fn list(&self) -> Vec<Arc<dyn AdPlatform>> {
        self.platforms.clone()
    }
}

//! Region-scoped AWS SDK configuration.
//!
//! Credentials come from the default provider chain (environment, profile,
//! instance metadata). The loaded [`SdkConfig`] is cached per region so that
//! repeated polls against the same region do not re-resolve credentials.

use aws_config::{BehaviorVersion, SdkConfig};
use aws_types::region::Region;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared AWS session that hands out per-region SDK configuration
#[derive(Clone)]
pub struct AwsSession {
    default_region: String,
    configs: Arc<RwLock<HashMap<String, SdkConfig>>>,
}

impl AwsSession {
    /// Create a session whose unqualified calls target `default_region`
    pub fn new(default_region: impl Into<String>) -> Self {
        Self {
            default_region: default_region.into(),
            configs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Region used when a caller does not name one
    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    /// SDK configuration for the default region
    pub async fn config(&self) -> SdkConfig {
        let region = self.default_region.clone();
        self.config_for_region(&region).await
    }

    /// SDK configuration for `region`, loading and caching it on first use
    pub async fn config_for_region(&self, region: &str) -> SdkConfig {
        if let Some(config) = self.configs.read().await.get(region) {
            return config.clone();
        }

        debug!("Loading AWS config for region {}", region);
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut configs = self.configs.write().await;
        configs
            .entry(region.to_string())
            .or_insert_with(|| config.clone());
        config
    }
}

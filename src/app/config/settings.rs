//! Probe settings loaded from TOML.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::data_plane::cloudwatch_logs::{TailOptions, WaitPolicy, DEFAULT_TAIL_LIMIT};

/// Environment variable that overrides the configured region
pub const REGION_ENV_VAR: &str = "INFRAPROBE_REGION";

/// Top-level probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Region for CloudWatch Logs and CloudTrail calls
    pub region: String,
    /// Most recent N events returned by a tail
    pub tail_limit: i32,
    /// Log group the application writes its access log to
    pub app_log_group: String,
    /// Deployment outputs JSON document (CDK `--outputs-file`)
    pub outputs_path: Option<PathBuf>,
    /// Stack key inside the deployment outputs document
    pub stack: String,
    /// Bounded polling behaviour
    pub wait: WaitSettings,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            region: "eu-central-1".to_string(),
            tail_limit: DEFAULT_TAIL_LIMIT,
            app_log_group: "/var/log/cloudxserverless-app".to_string(),
            outputs_path: None,
            stack: "cloudxserverless".to_string(),
            wait: WaitSettings::default(),
        }
    }
}

/// Timing of the wait loop, in plain numbers so the TOML stays readable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
    pub backoff_multiplier: f64,
    /// Fixed settle time for the legacy wait-then-tail flow
    pub settle_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 15_000,
            timeout_secs: 90,
            backoff_multiplier: 2.0,
            settle_secs: 55,
        }
    }
}

impl ProbeSettings {
    /// Default settings file location (`<config dir>/infraprobe/infraprobe.toml`)
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", "infraprobe")
            .map(|dirs| dirs.config_dir().join("infraprobe.toml"))
    }

    /// Parse settings from a TOML string and validate them
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: ProbeSettings =
            toml::from_str(content).context("Failed to parse probe settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Load settings from `path` when it exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                log_debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `INFRAPROBE_REGION` when set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(region) = std::env::var(REGION_ENV_VAR) {
            if !region.trim().is_empty() {
                self.region = region.trim().to_string();
            }
        }
        self
    }

    /// Reject settings the poller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            bail!("region must not be empty");
        }
        if self.tail_limit <= 0 {
            bail!("tail_limit must be positive, got {}", self.tail_limit);
        }
        let wait = &self.wait;
        if wait.initial_delay_ms == 0 {
            bail!("wait.initial_delay_ms must be positive");
        }
        if wait.max_delay_ms < wait.initial_delay_ms {
            bail!(
                "wait.max_delay_ms ({}) is smaller than wait.initial_delay_ms ({})",
                wait.max_delay_ms,
                wait.initial_delay_ms
            );
        }
        if !wait.backoff_multiplier.is_finite() || wait.backoff_multiplier < 1.0 {
            bail!(
                "wait.backoff_multiplier must be at least 1.0, got {}",
                wait.backoff_multiplier
            );
        }
        Ok(())
    }

    pub fn tail_options(&self) -> TailOptions {
        TailOptions::new().with_limit(self.tail_limit)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_millis(self.wait.initial_delay_ms),
            Duration::from_millis(self.wait.max_delay_ms),
            Duration::from_secs(self.wait.timeout_secs),
        )
        .with_multiplier(self.wait.backoff_multiplier)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.wait.settle_secs)
    }
}

//! Trader configuration

use crate::error::{OrchestratorError, OrchestratorResult};
use common::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_FEED_RETRY_ATTEMPTS, DEFAULT_FEED_RETRY_DELAY_MS};
use data_aggregator::{MarketConfig, ResampleConfig};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Orchestrator settings
///
/// Missing fields take their defaults, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderConfig {
    /// Starting cash in minor units; read from the store when unset
    pub cash: Option<i64>,

    /// Commission rate; read from the store when unset
    pub commission: Option<f64>,

    /// Resolutions every market aggregates at
    pub resample: Vec<ResampleConfig>,

    /// Load candle history into the containers before going live
    pub preload: bool,

    /// Attempts at opening the live tick feed
    pub feed_retry_attempts: u32,

    /// Pause between two feed attempts
    pub feed_retry_delay_ms: u64,

    /// Capacity of every pipeline link
    pub channel_capacity: usize,

    /// Candles kept per container; unbounded when unset
    pub container_capacity: Option<usize>,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            cash: None,
            commission: None,
            resample: vec![ResampleConfig::default()],
            preload: false,
            feed_retry_attempts: DEFAULT_FEED_RETRY_ATTEMPTS,
            feed_retry_delay_ms: DEFAULT_FEED_RETRY_DELAY_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            container_capacity: None,
        }
    }
}

impl TraderConfig {
    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Check every field before the orchestrator touches the store
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.resample.is_empty() {
            return Err(invalid("at least one resample resolution is required"));
        }

        let mut seen = FxHashSet::default();
        for resample in &self.resample {
            if resample.resolution_ms == 0 {
                return Err(invalid("resample resolution must be positive"));
            }
            if !seen.insert(resample.resolution_ms) {
                return Err(invalid(&format!(
                    "duplicate resample resolution {}ms",
                    resample.resolution_ms
                )));
            }
        }

        if let Some(commission) = self.commission {
            if !commission.is_finite() || commission < 0.0 {
                return Err(invalid("commission must be a non-negative number"));
            }
        }
        if self.cash.is_some_and(|cash| cash < 0) {
            return Err(invalid("cash must not be negative"));
        }
        if self.channel_capacity == 0 {
            return Err(invalid("channel capacity must be at least 1"));
        }
        if self.container_capacity == Some(0) {
            return Err(invalid("container capacity must be at least 1"));
        }
        if self.feed_retry_attempts == 0 {
            return Err(invalid("feed retry attempts must be at least 1"));
        }
        Ok(())
    }

    /// Market settings handed to the router
    #[must_use]
    pub fn market_config(&self) -> MarketConfig {
        MarketConfig {
            resample: self.resample.clone(),
            channel_capacity: self.channel_capacity,
        }
    }

    /// Pause between two feed attempts
    #[must_use]
    pub const fn feed_retry_delay(&self) -> Duration {
        Duration::from_millis(self.feed_retry_delay_ms)
    }
}

fn invalid(reason: &str) -> OrchestratorError {
    OrchestratorError::InvalidConfig {
        reason: reason.to_string(),
    }
}

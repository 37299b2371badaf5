//! Market aggregation configuration

use common::{CompressInfo, DEFAULT_CHANNEL_CAPACITY, DEFAULT_RESOLUTION_MS, EdgeAlignment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One resolution every market aggregates at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Bucket width in milliseconds
    pub resolution_ms: u64,

    /// Bucket boundary used to stamp candles
    #[serde(default)]
    pub alignment: EdgeAlignment,
}

impl ResampleConfig {
    /// Resample at `resolution` with `alignment`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(resolution: Duration, alignment: EdgeAlignment) -> Self {
        // SAFETY: resolutions are configured in milliseconds well below u64::MAX
        Self {
            resolution_ms: resolution.as_millis() as u64,
            alignment,
        }
    }

    /// Bucket width
    #[must_use]
    pub const fn resolution(&self) -> Duration {
        Duration::from_millis(self.resolution_ms)
    }
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            resolution_ms: DEFAULT_RESOLUTION_MS,
            alignment: EdgeAlignment::Left,
        }
    }
}

/// Settings shared by every market the router creates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Resolutions aggregated per market
    pub resample: Vec<ResampleConfig>,

    /// Capacity of tick and candle links
    pub channel_capacity: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            resample: vec![ResampleConfig::default()],
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl MarketConfig {
    /// Compression settings for `code`, one per configured resolution
    #[must_use]
    pub fn compress_infos(&self, code: &str) -> Vec<CompressInfo> {
        self.resample
            .iter()
            .map(|r| CompressInfo::new(code, r.resolution(), r.alignment))
            .collect()
    }
}

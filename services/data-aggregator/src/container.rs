//! Candle history containers
//!
//! One container per (code, resolution). Candles are kept newest first and
//! no two share a timestamp.

use common::{Candle, CompressInfo};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Newest-first candle sequence of one instrument at one resolution
#[derive(Debug)]
pub struct CandleContainer {
    info: CompressInfo,
    candles: RwLock<VecDeque<Candle>>,
    max_len: Option<usize>,
}

impl CandleContainer {
    /// Create an empty container; `max_len` caps retained candles
    #[must_use]
    pub fn new(info: CompressInfo, max_len: Option<usize>) -> Self {
        Self {
            info,
            candles: RwLock::new(VecDeque::new()),
            max_len,
        }
    }

    /// Compression settings of the stored candles
    #[must_use]
    pub const fn info(&self) -> &CompressInfo {
        &self.info
    }

    /// Insert a candle at its time position
    ///
    /// Returns `false` and keeps the stored candle if one with the same
    /// timestamp already exists.
    pub fn add(&self, candle: Candle) -> bool {
        let mut candles = self.candles.write();

        // Newest first, so search on the reversed ordering
        let position = candles.binary_search_by(|probe| candle.timestamp.cmp(&probe.timestamp));
        let Err(index) = position else {
            debug!(compress = %self.info, ts = %candle.timestamp, "Duplicate candle ignored");
            return false;
        };
        candles.insert(index, candle);

        if let Some(max_len) = self.max_len {
            candles.truncate(max_len.max(1));
        }
        true
    }

    /// Insert many candles; returns how many were new
    pub fn extend(&self, candles: impl IntoIterator<Item = Candle>) -> usize {
        candles.into_iter().map(|c| self.add(c)).filter(|added| *added).count()
    }

    /// Most recent candle
    #[must_use]
    pub fn latest(&self) -> Option<Candle> {
        self.candles.read().front().cloned()
    }

    /// Up to `n` most recent candles, newest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Candle> {
        self.candles.read().iter().take(n).cloned().collect()
    }

    /// Every stored candle, newest first
    #[must_use]
    pub fn values(&self) -> Vec<Candle> {
        self.candles.read().iter().cloned().collect()
    }

    /// Stored candle count
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.read().len()
    }

    /// Container holds no candle
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.read().is_empty()
    }

    /// Drop every stored candle
    pub fn clear(&self) {
        self.candles.write().clear();
    }
}

/// Containers of every (code, resolution) seen
#[derive(Debug, Default)]
pub struct CandleContainers {
    containers: RwLock<FxHashMap<CompressInfo, Arc<CandleContainer>>>,
    max_len: Option<usize>,
}

impl CandleContainers {
    /// Registry whose containers retain at most `max_len` candles
    #[must_use]
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            containers: RwLock::new(FxHashMap::default()),
            max_len,
        }
    }

    /// Container for `info`, created on first use
    pub fn get_or_create(&self, info: &CompressInfo) -> Arc<CandleContainer> {
        if let Some(container) = self.containers.read().get(info) {
            return Arc::clone(container);
        }
        let mut containers = self.containers.write();
        Arc::clone(
            containers
                .entry(info.clone())
                .or_insert_with(|| Arc::new(CandleContainer::new(info.clone(), self.max_len))),
        )
    }

    /// Existing container for `info`
    #[must_use]
    pub fn get(&self, info: &CompressInfo) -> Option<Arc<CandleContainer>> {
        self.containers.read().get(info).cloned()
    }

    /// Add a candle to the container of `info`
    pub fn add(&self, info: &CompressInfo, candle: Candle) -> bool {
        self.get_or_create(info).add(candle)
    }

    /// Every container
    #[must_use]
    pub fn all(&self) -> Vec<Arc<CandleContainer>> {
        self.containers.read().values().cloned().collect()
    }

    /// Number of containers
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    /// No container yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }
}

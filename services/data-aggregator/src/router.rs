//! Market router
//!
//! Keyed by instrument code. The first tick of an unseen code creates its
//! market under the registry lock, so concurrent first sight of a code
//! registers it exactly once. Markets live for the rest of the process.

use crate::config::MarketConfig;
use crate::market::{CompressedCandle, Market};
use bus::Shutdown;
use common::Tick;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Routing failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Shutdown fired while delivery was pending
    #[error("Routing cancelled by shutdown")]
    Cancelled,

    /// The market worker for this code has stopped
    #[error("Market {code} is closed")]
    MarketClosed {
        /// Instrument code
        code: String,
    },
}

/// Router counters
#[derive(Debug, Default)]
pub struct RouterStats {
    routed: AtomicU64,
    dropped: AtomicU64,
}

impl RouterStats {
    /// Ticks delivered to a market
    #[must_use]
    pub fn routed(&self) -> u64 {
        self.routed.load(Ordering::Relaxed)
    }

    /// Ticks dropped as malformed or undeliverable
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Routes ticks to per-code markets
pub struct MarketRouter {
    config: MarketConfig,
    markets: Mutex<FxHashMap<String, Market>>,
    candles: mpsc::Sender<CompressedCandle>,
    shutdown: Shutdown,
    stats: Arc<RouterStats>,
}

impl MarketRouter {
    /// Create a router and the stream of candles its markets complete
    #[must_use]
    pub fn new(
        config: MarketConfig,
        shutdown: Shutdown,
    ) -> (Self, mpsc::Receiver<CompressedCandle>) {
        let (candles, candle_rx) = mpsc::channel(config.channel_capacity.max(1));
        let router = Self {
            config,
            markets: Mutex::new(FxHashMap::default()),
            candles,
            shutdown,
            stats: Arc::new(RouterStats::default()),
        };
        (router, candle_rx)
    }

    /// Deliver a tick to its market, creating the market on first sight
    pub async fn route(&self, tick: Tick) -> Result<(), RouteError> {
        let sender = self.market_sender(&tick.code);

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(RouteError::Cancelled),
            sent = sender.send(tick) => sent.map_err(|e| RouteError::MarketClosed { code: e.0.code }),
        }
    }

    /// Route every tick of `ticks` until it ends or shutdown fires
    ///
    /// Malformed ticks are logged and dropped.
    pub async fn run(&self, mut ticks: mpsc::Receiver<Tick>) {
        info!("Market router started");
        loop {
            let tick = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                tick = ticks.recv() => match tick {
                    Some(tick) => tick,
                    None => break,
                },
            };

            if let Err(e) = tick.validate() {
                warn!(code = %tick.code, error = %e, "Malformed tick dropped");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            match self.route(tick).await {
                Ok(()) => {
                    self.stats.routed.fetch_add(1, Ordering::Relaxed);
                }
                Err(RouteError::Cancelled) => break,
                Err(e @ RouteError::MarketClosed { .. }) => {
                    warn!(error = %e, "Tick dropped");
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        info!(markets = self.market_count(), "Market router stopped");
    }

    fn market_sender(&self, code: &str) -> mpsc::Sender<Tick> {
        let mut markets = self.markets.lock();
        if let Some(market) = markets.get(code) {
            return market.sender();
        }

        let market = Market::spawn(code, &self.config, self.candles.clone(), &self.shutdown);
        info!(code, resolutions = market.infos().len(), "Market created");
        let sender = market.sender();
        markets.insert(code.to_string(), market);
        sender
    }

    /// Codes with a market
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.markets.lock().keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Number of markets created
    #[must_use]
    pub fn market_count(&self) -> usize {
        self.markets.lock().len()
    }

    /// Market settings
    #[must_use]
    pub const fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Router counters
    #[must_use]
    pub fn stats(&self) -> Arc<RouterStats> {
        Arc::clone(&self.stats)
    }
}


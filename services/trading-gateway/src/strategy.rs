//! Strategy contract and fan-out
//!
//! Strategies see every live tick, every completed candle and every order
//! event. They trade through the [`Broker`] handed to them at start.

use anyhow::Result;
use async_trait::async_trait;
use bus::{Event, Subscriber};
use common::{Candle, CompressInfo, Tick};
use oms::Broker;
use std::sync::Arc;
use tracing::{debug, error};

/// Trading strategy
///
/// Every hook has a no-op default, so a strategy only implements what it
/// reacts to.
#[async_trait]
pub trait Strategy: Send + Sync + 'static {
    /// Strategy name for logs
    fn name(&self) -> &str;

    /// Called once before any market data is delivered
    async fn start(&self, _broker: Arc<Broker>) -> Result<()> {
        Ok(())
    }

    /// Live tick
    async fn on_tick(&self, _tick: &Tick) -> Result<()> {
        Ok(())
    }

    /// Completed candle at `info`'s resolution
    async fn on_candle(&self, _info: &CompressInfo, _candle: &Candle) -> Result<()> {
        Ok(())
    }

    /// Order-lifecycle event
    async fn on_event(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

/// Delivers every input to every strategy, in registration order
///
/// A failing strategy is logged and does not stop delivery to the others.
#[derive(Default)]
pub struct StrategyEngine {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyEngine {
    /// Engine over `strategies`
    #[must_use]
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Number of strategies
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// No strategy configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Hand the broker to every strategy
    pub async fn start(&self, broker: &Arc<Broker>) {
        for strategy in &self.strategies {
            match strategy.start(Arc::clone(broker)).await {
                Ok(()) => debug!(strategy = strategy.name(), "Strategy started"),
                Err(e) => error!(strategy = strategy.name(), error = %e, "Strategy failed to start"),
            }
        }
    }

    /// Deliver a live tick
    pub async fn on_tick(&self, tick: &Tick) {
        for strategy in &self.strategies {
            if let Err(e) = strategy.on_tick(tick).await {
                error!(strategy = strategy.name(), code = %tick.code, error = %e, "Strategy tick handler failed");
            }
        }
    }

    /// Deliver a completed candle
    pub async fn on_candle(&self, info: &CompressInfo, candle: &Candle) {
        for strategy in &self.strategies {
            if let Err(e) = strategy.on_candle(info, candle).await {
                error!(strategy = strategy.name(), compress = %info, error = %e, "Strategy candle handler failed");
            }
        }
    }
}

#[async_trait]
impl Subscriber for StrategyEngine {
    async fn on_event(&self, event: &Event) -> Result<()> {
        for strategy in &self.strategies {
            if let Err(e) = strategy.on_event(event).await {
                error!(strategy = strategy.name(), kind = event.kind(), error = %e, "Strategy event handler failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "strategies"
    }
}

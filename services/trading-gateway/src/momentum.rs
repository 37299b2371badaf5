//! Moving-average crossover strategy
//!
//! Tracks candle closes per code and trades when the short average crosses
//! the long one: a golden cross buys, a death cross sells the open position.

use crate::strategy::Strategy;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bus::Event;
use common::{Candle, CompressInfo, OrderRequest, OrderSide, OrderState};
use feeds::Store;
use oms::Broker;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Relative position of the two averages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Above,
    Below,
}

#[derive(Debug, Default)]
struct Series {
    closes: VecDeque<f64>,
    trend: Option<Trend>,
}

/// Momentum strategy
pub struct MomentumStrategy {
    store: Arc<dyn Store>,
    broker: Mutex<Option<Arc<Broker>>>,
    short_window: usize,
    long_window: usize,
    order_size: u64,
    series: Mutex<FxHashMap<CompressInfo, Series>>,
    signals_generated: AtomicU64,
}

impl MomentumStrategy {
    /// Crossover of a 5 and a 20 candle average, trading one unit
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_windows(store, 5, 20, 1)
    }

    /// Crossover of `short_window` and `long_window` candle averages
    #[must_use]
    pub fn with_windows(
        store: Arc<dyn Store>,
        short_window: usize,
        long_window: usize,
        order_size: u64,
    ) -> Self {
        let short_window = short_window.max(1);
        Self {
            store,
            broker: Mutex::new(None),
            short_window,
            long_window: long_window.max(short_window + 1),
            order_size: order_size.max(1),
            series: Mutex::new(FxHashMap::default()),
            signals_generated: AtomicU64::new(0),
        }
    }

    /// Crossovers acted on so far
    #[must_use]
    pub fn signals_generated(&self) -> u64 {
        self.signals_generated.load(Ordering::Relaxed)
    }

    /// Record a close and report a fresh crossover
    fn observe(&self, info: &CompressInfo, close: f64) -> Option<Trend> {
        let mut series = self.series.lock();
        let entry = series.entry(info.clone()).or_default();

        entry.closes.push_back(close);
        if entry.closes.len() > self.long_window {
            entry.closes.pop_front();
        }
        if entry.closes.len() < self.long_window {
            return None;
        }

        let short = mean(entry.closes.iter().rev().take(self.short_window));
        let long = mean(entry.closes.iter());
        let trend = if short > long {
            Trend::Above
        } else if short < long {
            Trend::Below
        } else {
            return None;
        };

        let previous = entry.trend.replace(trend);
        match previous {
            Some(previous) if previous != trend => Some(trend),
            _ => None,
        }
    }

    async fn place(&self, broker: &Broker, request: OrderRequest) -> Result<()> {
        let order = broker.submit(request)?;
        if let Err(e) = self.store.order(&order).await {
            // Order never reached the exchange
            warn!(order_id = %order.id, error = %e, "Store rejected order, canceling");
            broker.cancel(&order.id)?;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    async fn start(&self, broker: Arc<Broker>) -> Result<()> {
        info!(
            short = self.short_window,
            long = self.long_window,
            store = self.store.uid(),
            "Momentum strategy started"
        );
        *self.broker.lock() = Some(broker);
        Ok(())
    }

    async fn on_candle(&self, info: &CompressInfo, candle: &Candle) -> Result<()> {
        let Some(trend) = self.observe(info, candle.close) else {
            return Ok(());
        };
        let broker = self
            .broker
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("momentum strategy has not been started"))?;
        self.signals_generated.fetch_add(1, Ordering::Relaxed);

        match trend {
            Trend::Above => {
                info!(compress = %info, close = candle.close, "Golden cross");
                let request =
                    OrderRequest::limit(&candle.code, OrderSide::Buy, self.order_size, candle.close);
                self.place(&broker, request).await
            }
            Trend::Below => {
                let held = broker.position(&candle.code).map_or(0, |p| p.size);
                if held <= 0 {
                    debug!(compress = %info, "Death cross without a long position");
                    return Ok(());
                }
                info!(compress = %info, close = candle.close, held, "Death cross");
                let request =
                    OrderRequest::limit(&candle.code, OrderSide::Sell, held.unsigned_abs(), candle.close);
                self.place(&broker, request).await
            }
        }
    }

    async fn on_event(&self, event: &Event) -> Result<()> {
        if let Event::Order(order) = event {
            if order.state == OrderState::Done {
                debug!(order_id = %order.order_id, "Momentum order filled");
            }
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    // SAFETY: windows hold far fewer than 2^53 closes
    sum / count as f64
}

//! Random-walk store for local runs
//!
//! Produces ticks for a fixed set of codes and fills every order it is sent
//! by publishing a `done` order event.

use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{Candle, Order, OrderEvent, OrderState, Position, Tick, TickSide};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info};

/// Simulated store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedStoreConfig {
    /// Codes to produce ticks for
    pub codes: Vec<String>,
    /// First price of every code
    pub start_price: f64,
    /// Relative size of one random-walk step
    pub volatility: f64,
    /// Pause between two ticks
    pub tick_interval: Duration,
    /// Cash reported to the engine
    pub cash: i64,
    /// Commission reported to the engine
    pub commission: f64,
    /// Candles returned by `load_history`
    pub history_len: usize,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulatedStoreConfig {
    fn default() -> Self {
        Self {
            codes: vec!["KRW-BTC".to_string()],
            start_price: 100.0,
            volatility: 0.001,
            tick_interval: Duration::from_millis(100),
            cash: 1_000_000,
            commission: 0.0005,
            history_len: 60,
            seed: None,
        }
    }
}

/// In-process store backed by a random walk
pub struct SimulatedStore {
    uid: String,
    config: SimulatedStoreConfig,
    order_events: Mutex<Option<mpsc::Sender<OrderEvent>>>,
    sent_orders: Mutex<FxHashMap<String, Order>>,
}

impl SimulatedStore {
    /// Create a simulated store
    #[must_use]
    pub fn new(config: SimulatedStoreConfig) -> Self {
        Self {
            uid: uuid::Uuid::new_v4().to_string(),
            config,
            order_events: Mutex::new(None),
            sent_orders: Mutex::new(FxHashMap::default()),
        }
    }

    /// Orders received so far
    #[must_use]
    pub fn sent_orders(&self) -> usize {
        self.sent_orders.lock().len()
    }

    fn rng(&self) -> StdRng {
        self.config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
    }

    async fn publish(&self, event: OrderEvent) -> anyhow::Result<()> {
        let sender = self.order_events.lock().clone();
        if let Some(sender) = sender {
            sender
                .send(event)
                .await
                .map_err(|_| anyhow::anyhow!("order-state stream closed"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for SimulatedStore {
    async fn load_history(&self, resolution: Duration) -> anyhow::Result<Vec<Candle>> {
        let step = ChronoDuration::from_std(resolution)?;
        let step_ms = step.num_milliseconds();
        anyhow::ensure!(step_ms > 0, "resolution must be at least one millisecond");

        // Start of the bucket still open; history ends with the one before it
        let open_ms = Utc::now().timestamp_millis().div_euclid(step_ms) * step_ms;
        let open_bucket = DateTime::from_timestamp_millis(open_ms)
            .ok_or_else(|| anyhow::anyhow!("bucket start {open_ms}ms out of range"))?;

        let mut rng = self.rng();
        let mut candles = Vec::with_capacity(self.config.history_len * self.config.codes.len());

        for code in &self.config.codes {
            let mut price = self.config.start_price;
            for i in (1..=self.config.history_len).rev() {
                let open = price;
                let close = walk(&mut rng, open, self.config.volatility);
                let spread = open.max(close) * self.config.volatility;
                candles.push(Candle {
                    code: code.clone(),
                    open,
                    high: open.max(close) + spread,
                    low: (open.min(close) - spread).max(f64::MIN_POSITIVE),
                    close,
                    volume: rng.gen_range(1.0..10.0),
                    timestamp: open_bucket - step * i32::try_from(i)?,
                });
                price = close;
            }
        }
        candles.sort_by_key(|candle| candle.timestamp);
        Ok(candles)
    }

    async fn load_tick(&self) -> anyhow::Result<mpsc::Receiver<Tick>> {
        anyhow::ensure!(!self.config.codes.is_empty(), "no codes configured");

        let (tx, rx) = mpsc::channel(1);
        let codes = self.config.codes.clone();
        let volatility = self.config.volatility;
        let mut prices = vec![self.config.start_price; codes.len()];
        let mut rng = self.rng();
        let mut ticker = interval(self.config.tick_interval);

        tokio::spawn(async move {
            'feed: loop {
                ticker.tick().await;
                for (code, price) in codes.iter().zip(prices.iter_mut()) {
                    *price = walk(&mut rng, *price, volatility);
                    let side = if rng.gen_bool(0.5) {
                        TickSide::Bid
                    } else {
                        TickSide::Ask
                    };
                    let tick = Tick::new(
                        code.clone(),
                        side,
                        Utc::now(),
                        *price,
                        rng.gen_range(0.01..1.0),
                    );
                    if tx.send(tick).await.is_err() {
                        break 'feed;
                    }
                }
            }
            debug!("Simulated tick feed stopped");
        });

        info!(codes = self.config.codes.len(), "Simulated tick feed opened");
        Ok(rx)
    }

    async fn order_state(&self) -> anyhow::Result<mpsc::Receiver<OrderEvent>> {
        let (tx, rx) = mpsc::channel(64);
        *self.order_events.lock() = Some(tx);
        Ok(rx)
    }

    async fn order(&self, order: &Order) -> anyhow::Result<()> {
        self.sent_orders
            .lock()
            .insert(order.id.clone(), order.clone());
        self.publish(OrderEvent::new(&order.id, OrderState::Done).with_message("filled"))
            .await
    }

    async fn cancel(&self, order_id: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.sent_orders.lock().contains_key(order_id),
            "unknown order {order_id}"
        );
        self.publish(OrderEvent::new(order_id, OrderState::Cancel))
            .await
    }

    async fn positions(&self) -> anyhow::Result<Vec<Position>> {
        Ok(Vec::new())
    }

    async fn cash(&self) -> anyhow::Result<i64> {
        Ok(self.config.cash)
    }

    async fn commission(&self) -> anyhow::Result<f64> {
        Ok(self.config.commission)
    }

    fn uid(&self) -> &str {
        &self.uid
    }
}

fn walk(rng: &mut StdRng, price: f64, volatility: f64) -> f64 {
    let step = rng.gen_range(-volatility..=volatility);
    (price * (1.0 + step)).max(f64::MIN_POSITIVE)
}

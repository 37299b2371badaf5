//! Mock store and subscribers for engine tests

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bus::{Event, Subscriber};
use common::{Candle, Order, OrderEvent, Position, Tick};
use feeds::Store;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Producer side of a [`MockStore`]
///
/// Dropping a sender closes the matching store stream.
#[derive(Debug)]
pub struct MockFeed {
    /// Live tick stream
    pub ticks: mpsc::Sender<Tick>,
    /// Order-state stream
    pub orders: mpsc::Sender<OrderEvent>,
}

impl MockFeed {
    /// Push ticks in order
    ///
    /// # Errors
    ///
    /// Fails if the engine dropped the tick stream.
    pub async fn send_ticks(&self, ticks: impl IntoIterator<Item = Tick>) -> Result<()> {
        for tick in ticks {
            self.ticks
                .send(tick)
                .await
                .map_err(|_| anyhow!("tick stream closed"))?;
        }
        Ok(())
    }

    /// Push one order-state event
    ///
    /// # Errors
    ///
    /// Fails if the engine dropped the order-state stream.
    pub async fn send_order_event(&self, event: OrderEvent) -> Result<()> {
        self.orders
            .send(event)
            .await
            .map_err(|_| anyhow!("order-state stream closed"))
    }
}

/// Scriptable store
///
/// `load_tick` fails the configured number of times before handing out the
/// tick stream, which can be taken once.
#[derive(Debug)]
pub struct MockStore {
    uid: String,
    cash: i64,
    commission: f64,
    positions: Vec<Position>,
    history: Vec<Candle>,
    tick_failures: AtomicU32,
    tick_attempts: AtomicU32,
    fail_order_state: bool,
    ticks: Mutex<Option<mpsc::Receiver<Tick>>>,
    orders: Mutex<Option<mpsc::Receiver<OrderEvent>>>,
    history_requests: Mutex<Vec<Duration>>,
    sent_orders: Mutex<Vec<Order>>,
    canceled: Mutex<Vec<String>>,
}

impl MockStore {
    /// Store and the feed that drives it
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, MockFeed) {
        let (tick_tx, tick_rx) = mpsc::channel(capacity.max(1));
        let (order_tx, order_rx) = mpsc::channel(capacity.max(1));
        let store = Self {
            uid: uuid::Uuid::new_v4().to_string(),
            cash: 1_000_000,
            commission: 0.0,
            positions: Vec::new(),
            history: Vec::new(),
            tick_failures: AtomicU32::new(0),
            tick_attempts: AtomicU32::new(0),
            fail_order_state: false,
            ticks: Mutex::new(Some(tick_rx)),
            orders: Mutex::new(Some(order_rx)),
            history_requests: Mutex::new(Vec::new()),
            sent_orders: Mutex::new(Vec::new()),
            canceled: Mutex::new(Vec::new()),
        };
        let feed = MockFeed {
            ticks: tick_tx,
            orders: order_tx,
        };
        (store, feed)
    }

    /// Cash reported by the store
    #[must_use]
    pub fn with_cash(mut self, cash: i64) -> Self {
        self.cash = cash;
        self
    }

    /// Commission reported by the store
    #[must_use]
    pub fn with_commission(mut self, commission: f64) -> Self {
        self.commission = commission;
        self
    }

    /// Positions reported by the store
    #[must_use]
    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.positions = positions;
        self
    }

    /// Candles returned by every `load_history` call
    #[must_use]
    pub fn with_history(mut self, history: Vec<Candle>) -> Self {
        self.history = history;
        self
    }

    /// Fail the first `failures` calls of `load_tick`
    #[must_use]
    pub fn with_tick_failures(self, failures: u32) -> Self {
        self.tick_failures.store(failures, Ordering::SeqCst);
        self
    }

    /// Fail every `order_state` call
    #[must_use]
    pub fn with_failing_order_state(mut self) -> Self {
        self.fail_order_state = true;
        self
    }

    /// Calls made to `load_tick`
    #[must_use]
    pub fn tick_attempts(&self) -> u32 {
        self.tick_attempts.load(Ordering::SeqCst)
    }

    /// Resolutions `load_history` was called with
    #[must_use]
    pub fn history_requests(&self) -> Vec<Duration> {
        self.history_requests.lock().clone()
    }

    /// Orders sent through the store
    #[must_use]
    pub fn sent_orders(&self) -> Vec<Order> {
        self.sent_orders.lock().clone()
    }

    /// Ids canceled through the store
    #[must_use]
    pub fn canceled(&self) -> Vec<String> {
        self.canceled.lock().clone()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn load_history(&self, resolution: Duration) -> Result<Vec<Candle>> {
        self.history_requests.lock().push(resolution);
        Ok(self.history.clone())
    }

    async fn load_tick(&self) -> Result<mpsc::Receiver<Tick>> {
        self.tick_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.tick_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.tick_failures.store(remaining - 1, Ordering::SeqCst);
            bail!("feed unavailable ({remaining} failures left)");
        }
        self.ticks
            .lock()
            .take()
            .ok_or_else(|| anyhow!("tick stream already taken"))
    }

    async fn order_state(&self) -> Result<mpsc::Receiver<OrderEvent>> {
        if self.fail_order_state {
            bail!("order-state stream unavailable");
        }
        self.orders
            .lock()
            .take()
            .ok_or_else(|| anyhow!("order-state stream already taken"))
    }

    async fn order(&self, order: &Order) -> Result<()> {
        self.sent_orders.lock().push(order.clone());
        Ok(())
    }

    async fn cancel(&self, order_id: &str) -> Result<()> {
        self.canceled.lock().push(order_id.to_string());
        Ok(())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        Ok(self.positions.clone())
    }

    async fn cash(&self) -> Result<i64> {
        Ok(self.cash)
    }

    async fn commission(&self) -> Result<f64> {
        Ok(self.commission)
    }

    fn uid(&self) -> &str {
        &self.uid
    }
}

/// Subscriber that keeps every event it receives
#[derive(Debug)]
pub struct RecordingSubscriber {
    name: String,
    events: Mutex<Vec<Event>>,
}

impl RecordingSubscriber {
    /// Named recorder
    #[must_use]
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Events received so far
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Order ids of received order events
    #[must_use]
    pub fn order_ids(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Order(order) => Some(order.order_id.clone()),
                Event::System { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn on_event(&self, event: &Event) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

//! Orchestrator - lifecycle and wiring
//!
//! `start` runs every fallible step first (config, store, account, feed,
//! order-state stream, history) and only then spawns workers, so a failed
//! start leaves nothing running. All workers share one [`Shutdown`] signal.

use crate::config::TraderConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::strategy::{Strategy, StrategyEngine};
use bus::{Event, EventBusError, EventEngine, Shutdown, Subscriber};
use common::{CompressInfo, OrderEvent, Tick};
use data_aggregator::{CandleContainers, CompressedCandle, MarketRouter};
use feeds::{RetryError, Store, retry, tee};
use futures::future::join_all;
use oms::Broker;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Owns the engine components and their workers
pub struct Orchestrator {
    config: TraderConfig,
    store: Option<Arc<dyn Store>>,
    strategies: Vec<Arc<dyn Strategy>>,
    broker: Arc<Broker>,
    events: Arc<EventEngine>,
    containers: Arc<CandleContainers>,
    router: Arc<MarketRouter>,
    candles: Mutex<Option<mpsc::Receiver<CompressedCandle>>>,
    shutdown: Shutdown,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Build the components; nothing runs until [`Orchestrator::start`]
    #[must_use]
    pub fn new(config: TraderConfig) -> Self {
        let shutdown = Shutdown::new();
        let (router, candles) = MarketRouter::new(config.market_config(), shutdown.clone());
        Self {
            broker: Arc::new(Broker::new(config.cash.unwrap_or(0), config.commission.unwrap_or(0.0))),
            events: Arc::new(EventEngine::new()),
            containers: Arc::new(CandleContainers::new(config.container_capacity)),
            router: Arc::new(router),
            candles: Mutex::new(Some(candles)),
            store: None,
            strategies: Vec::new(),
            config,
            shutdown,
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Market data and exchange access
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add a strategy; strategies receive inputs in the order they were added
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Connect to the store and spawn every worker
    pub async fn start(&self) -> OrchestratorResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyStarted);
        }

        match self.launch().await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "Trader failed to start");
                self.started.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn launch(&self) -> OrchestratorResult<()> {
        self.config.validate()?;
        let store = self
            .store
            .clone()
            .ok_or(OrchestratorError::StoreNotConfigured)?;
        if self.strategies.is_empty() {
            warn!("No strategy configured, trader will only aggregate candles");
        }

        info!(store = store.uid(), "Starting trader");
        self.sync_account(store.as_ref()).await?;

        let attempts = self.config.feed_retry_attempts;
        let ticks = retry(attempts, self.config.feed_retry_delay(), &self.shutdown, || {
            store.load_tick()
        })
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => OrchestratorError::FeedUnavailable {
                attempts,
                reason: last.to_string(),
            },
            RetryError::Cancelled => OrchestratorError::Cancelled,
        })?;

        let order_events = store.order_state().await.map_err(|e| {
            OrchestratorError::OrderStreamUnavailable {
                reason: e.to_string(),
            }
        })?;

        if self.config.preload {
            self.preload(store.as_ref()).await?;
        }

        if self.shutdown.is_triggered() {
            return Err(OrchestratorError::Cancelled);
        }
        let candles = self
            .candles
            .lock()
            .take()
            .ok_or(OrchestratorError::AlreadyStarted)?;

        self.spawn_workers(ticks, order_events, candles).await?;
        info!(
            strategies = self.strategies.len(),
            resolutions = self.config.resample.len(),
            "Trader started"
        );
        Ok(())
    }

    async fn sync_account(&self, store: &dyn Store) -> OrchestratorResult<()> {
        let cash = match self.config.cash {
            Some(cash) => cash,
            None => store.cash().await.map_err(account_unavailable)?,
        };
        let commission = match self.config.commission {
            Some(commission) => commission,
            None => store.commission().await.map_err(account_unavailable)?,
        };
        let positions = store.positions().await.map_err(account_unavailable)?;
        self.broker.sync_account(cash, commission, positions);
        Ok(())
    }

    /// Load candle history of every configured resolution into the containers
    async fn preload(&self, store: &dyn Store) -> OrchestratorResult<()> {
        for resample in &self.config.resample {
            let resolution = resample.resolution();
            let history = store.load_history(resolution).await.map_err(|e| {
                OrchestratorError::HistoryUnavailable {
                    reason: e.to_string(),
                }
            })?;

            let total = history.len();
            let mut added = 0;
            for candle in history {
                if !candle.is_consistent() {
                    warn!(code = %candle.code, ts = %candle.timestamp, "Inconsistent history candle dropped");
                    continue;
                }
                let info = CompressInfo::new(&candle.code, resolution, resample.alignment);
                if self.containers.add(&info, candle) {
                    added += 1;
                }
            }
            info!(resolution_ms = resample.resolution_ms, total, added, "History preloaded");
        }
        Ok(())
    }

    async fn spawn_workers(
        &self,
        ticks: mpsc::Receiver<Tick>,
        order_events: mpsc::Receiver<OrderEvent>,
        candles: mpsc::Receiver<CompressedCandle>,
    ) -> OrchestratorResult<()> {
        let strategies = Arc::new(StrategyEngine::new(self.strategies.clone()));
        self.events.register(Arc::clone(&strategies) as Arc<dyn Subscriber>)?;
        self.events.register(Arc::clone(&self.broker) as Arc<dyn Subscriber>)?;

        let mut workers = Vec::with_capacity(5);
        workers.push(self.events.start(self.shutdown.clone())?);

        strategies.start(&self.broker).await;

        workers.push(tokio::spawn(forward_order_events(
            order_events,
            Arc::clone(&self.events),
            self.shutdown.clone(),
        )));

        let (route_ticks, strategy_ticks) =
            tee(ticks, self.config.channel_capacity, self.shutdown.clone());

        let router = Arc::clone(&self.router);
        workers.push(tokio::spawn(async move { router.run(route_ticks).await }));

        workers.push(tokio::spawn(consume_ticks(
            strategy_ticks,
            Arc::clone(&strategies),
            self.shutdown.clone(),
        )));

        workers.push(tokio::spawn(consume_candles(
            candles,
            Arc::clone(&self.containers),
            strategies,
            self.shutdown.clone(),
        )));

        self.workers.lock().extend(workers);
        Ok(())
    }

    /// Signal every worker to stop; later calls do nothing
    pub fn stop(&self) {
        if self.shutdown.trigger() {
            info!("Trader stopping");
        } else {
            debug!("Trader already stopping");
        }
    }

    /// Wait up to `limit` for the workers to exit; `true` when all did
    pub async fn wait_stopped(&self, limit: Duration) -> bool {
        let workers = std::mem::take(&mut *self.workers.lock());
        let joined = timeout(limit, join_all(workers)).await;
        match joined {
            Ok(results) => {
                for e in results.into_iter().filter_map(Result::err) {
                    error!(error = %e, "Worker panicked");
                }
                true
            }
            Err(_) => {
                warn!(?limit, "Workers still running after stop");
                false
            }
        }
    }

    /// Block until [`Orchestrator::stop`] is called
    pub async fn run_until_shutdown(&self) {
        self.shutdown.cancelled().await;
    }

    /// Started and not stopped
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.is_triggered()
    }

    /// Trader configuration
    #[must_use]
    pub const fn config(&self) -> &TraderConfig {
        &self.config
    }

    /// Order book and account
    #[must_use]
    pub fn broker(&self) -> Arc<Broker> {
        Arc::clone(&self.broker)
    }

    /// Candle history
    #[must_use]
    pub fn containers(&self) -> Arc<CandleContainers> {
        Arc::clone(&self.containers)
    }

    /// Tick router
    #[must_use]
    pub fn router(&self) -> Arc<MarketRouter> {
        Arc::clone(&self.router)
    }

    /// Order-event hub
    #[must_use]
    pub fn event_engine(&self) -> Arc<EventEngine> {
        Arc::clone(&self.events)
    }

    /// Shutdown signal shared by every worker
    #[must_use]
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }
}

fn account_unavailable(e: anyhow::Error) -> OrchestratorError {
    OrchestratorError::AccountUnavailable {
        reason: e.to_string(),
    }
}

async fn forward_order_events(
    mut order_events: mpsc::Receiver<OrderEvent>,
    events: Arc<EventEngine>,
    shutdown: Shutdown,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            event = order_events.recv() => match event {
                Some(event) => event,
                None => {
                    warn!("Order-state stream closed");
                    break;
                }
            },
        };

        debug!(order_id = %event.order_id, state = %event.state.as_tag(), "Order event received");
        if let Err(EventBusError::Closed) = events.broadcast(Event::Order(event)) {
            break;
        }
    }
    debug!("Order-event forwarder stopped");
}

async fn consume_ticks(
    mut ticks: mpsc::Receiver<Tick>,
    strategies: Arc<StrategyEngine>,
    shutdown: Shutdown,
) {
    loop {
        let tick = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            tick = ticks.recv() => match tick {
                Some(tick) => tick,
                None => {
                    warn!("Tick feed closed");
                    break;
                }
            },
        };

        if let Err(e) = tick.validate() {
            warn!(code = %tick.code, error = %e, "Malformed tick kept from strategies");
            continue;
        }
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = strategies.on_tick(&tick) => {}
        }
    }
    debug!("Tick consumer stopped");
}

async fn consume_candles(
    mut candles: mpsc::Receiver<CompressedCandle>,
    containers: Arc<CandleContainers>,
    strategies: Arc<StrategyEngine>,
    shutdown: Shutdown,
) {
    loop {
        let CompressedCandle { info, candle } = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            candle = candles.recv() => match candle {
                Some(candle) => candle,
                None => break,
            },
        };

        debug!(compress = %info, %candle, "Candle completed");
        if !containers.add(&info, candle.clone()) {
            continue;
        }
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = strategies.on_candle(&info, &candle) => {}
        }
    }
    debug!("Candle consumer stopped");
}

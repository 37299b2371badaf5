//! Event engine implementation
//!
//! Registration and publication travel through one ordered command queue,
//! so a subscriber sees exactly the events published after its
//! registration. Commands issued before [`EventEngine::start`] wait in the
//! queue.

use crate::error::{BusResult, EventBusError};
use crate::event::{Event, Subscriber};
use crate::shutdown::Shutdown;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

enum Command {
    Register(Arc<dyn Subscriber>),
    Publish(Arc<Event>),
}

/// Engine counters
#[derive(Debug, Default)]
pub struct EngineStats {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    subscribers: AtomicU64,
}

impl EngineStats {
    /// Events dispatched to subscriber queues
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Successful `on_event` calls across all subscribers
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Failed `on_event` calls across all subscribers
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Subscribers attached to the dispatcher
    #[must_use]
    pub fn subscribers(&self) -> u64 {
        self.subscribers.load(Ordering::Relaxed)
    }
}

/// Central pub/sub hub
pub struct EventEngine {
    commands: mpsc::UnboundedSender<Command>,
    pending: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    stats: Arc<EngineStats>,
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEngine {
    /// Create a stopped engine
    #[must_use]
    pub fn new() -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        Self {
            commands,
            pending: Mutex::new(Some(rx)),
            stats: Arc::new(EngineStats::default()),
        }
    }

    /// Register a subscriber for every event published from now on
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> BusResult<()> {
        debug!(subscriber = subscriber.name(), "Registering subscriber");
        self.commands
            .send(Command::Register(subscriber))
            .map_err(|_| EventBusError::Closed)
    }

    /// Publish an event to every registered subscriber
    pub fn broadcast(&self, event: Event) -> BusResult<()> {
        self.commands
            .send(Command::Publish(Arc::new(event)))
            .map_err(|_| EventBusError::Closed)
    }

    /// Engine has been started
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.pending.lock().is_none()
    }

    /// Engine counters
    #[must_use]
    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Start dispatching until `shutdown` fires
    ///
    /// The returned handle completes once the dispatcher and every
    /// subscriber worker have exited.
    pub fn start(&self, shutdown: Shutdown) -> BusResult<JoinHandle<()>> {
        let commands = self
            .pending
            .lock()
            .take()
            .ok_or(EventBusError::AlreadyStarted)?;
        let stats = Arc::clone(&self.stats);
        info!("Event engine started");
        Ok(tokio::spawn(dispatch(commands, shutdown, stats)))
    }
}

struct SubscriberQueue {
    name: String,
    tx: mpsc::UnboundedSender<Arc<Event>>,
}

async fn dispatch(
    mut commands: mpsc::UnboundedReceiver<Command>,
    shutdown: Shutdown,
    stats: Arc<EngineStats>,
) {
    let mut queues: Vec<SubscriberQueue> = Vec::new();
    let mut workers = JoinSet::new();

    loop {
        let command = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            Command::Register(subscriber) => {
                let (tx, rx) = mpsc::unbounded_channel();
                queues.push(SubscriberQueue {
                    name: subscriber.name().to_string(),
                    tx,
                });
                stats.subscribers.fetch_add(1, Ordering::Relaxed);
                workers.spawn(deliver(subscriber, rx, shutdown.clone(), Arc::clone(&stats)));
            }
            Command::Publish(event) => {
                debug!(kind = event.kind(), subscribers = queues.len(), "Dispatching event");
                for queue in &queues {
                    if queue.tx.send(Arc::clone(&event)).is_err() {
                        warn!(subscriber = %queue.name, "Subscriber worker gone, event skipped");
                    }
                }
                stats.published.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // Closing the queues lets idle workers finish
    drop(queues);
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Subscriber worker panicked");
        }
    }
    info!("Event engine stopped");
}

async fn deliver(
    subscriber: Arc<dyn Subscriber>,
    mut events: mpsc::UnboundedReceiver<Arc<Event>>,
    shutdown: Shutdown,
    stats: Arc<EngineStats>,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            result = subscriber.on_event(&event) => match result {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        subscriber = subscriber.name(),
                        kind = event.kind(),
                        error = %e,
                        "Event handling failed"
                    );
                }
            },
        }
    }
    debug!(subscriber = subscriber.name(), "Subscriber worker stopped");
}

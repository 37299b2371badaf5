//! Shared strategy doubles for orchestrator tests

use anyhow::Result;
use async_trait::async_trait;
use bus::Event;
use common::{Candle, CompressInfo, Tick};
use oms::Broker;
use parking_lot::Mutex;
use std::sync::Arc;
use trading_gateway::Strategy;

/// Strategy that keeps everything it is handed
#[derive(Default)]
pub struct RecordingStrategy {
    broker: Mutex<Option<Arc<Broker>>>,
    ticks: Mutex<Vec<Tick>>,
    candles: Mutex<Vec<(CompressInfo, Candle)>>,
    events: Mutex<Vec<Event>>,
}

#[allow(dead_code)]
impl RecordingStrategy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> bool {
        self.broker.lock().is_some()
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.ticks.lock().clone()
    }

    pub fn candles(&self) -> Vec<(CompressInfo, Candle)> {
        self.candles.lock().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Strategy for RecordingStrategy {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self, broker: Arc<Broker>) -> Result<()> {
        *self.broker.lock() = Some(broker);
        Ok(())
    }

    async fn on_tick(&self, tick: &Tick) -> Result<()> {
        self.ticks.lock().push(tick.clone());
        Ok(())
    }

    async fn on_candle(&self, info: &CompressInfo, candle: &Candle) -> Result<()> {
        self.candles.lock().push((info.clone(), candle.clone()));
        Ok(())
    }

    async fn on_event(&self, event: &Event) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Strategy whose candle handler never returns
pub struct BlockingStrategy;

#[async_trait]
impl Strategy for BlockingStrategy {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn on_candle(&self, _info: &CompressInfo, _candle: &Candle) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

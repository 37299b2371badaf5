//! External store contract

use async_trait::async_trait;
use common::{Candle, Order, OrderEvent, Position, Tick};
use std::time::Duration;
use tokio::sync::mpsc;

/// Market data and exchange access consumed by the engine
///
/// Streams end when the store closes them; dropping the receiver tells the
/// store to stop producing.
#[async_trait]
pub trait Store: Send + Sync {
    /// Historical candles at `resolution`, oldest first
    async fn load_history(&self, resolution: Duration) -> anyhow::Result<Vec<Candle>>;

    /// Open the live tick stream
    async fn load_tick(&self) -> anyhow::Result<mpsc::Receiver<Tick>>;

    /// Open the live order-state stream
    async fn order_state(&self) -> anyhow::Result<mpsc::Receiver<OrderEvent>>;

    /// Send an order to the exchange
    async fn order(&self, order: &Order) -> anyhow::Result<()>;

    /// Cancel an order at the exchange
    async fn cancel(&self, order_id: &str) -> anyhow::Result<()>;

    /// Open positions
    async fn positions(&self) -> anyhow::Result<Vec<Position>>;

    /// Available cash in minor units
    async fn cash(&self) -> anyhow::Result<i64>;

    /// Commission rate
    async fn commission(&self) -> anyhow::Result<f64>;

    /// Store instance id
    fn uid(&self) -> &str;
}

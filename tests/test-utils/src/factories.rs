//! Factory patterns for generating test data

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{Candle, OrderEvent, OrderRequest, OrderSide, OrderState, Tick, TickSide};

/// Fixed, minute-aligned reference time of every factory
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Factory for ticks of one instrument
#[derive(Debug, Clone)]
pub struct TickFactory {
    code: String,
    base: DateTime<Utc>,
    side: TickSide,
}

impl TickFactory {
    /// Ticks for `code` relative to [`base_time`]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            base: base_time(),
            side: TickSide::Bid,
        }
    }

    /// Use another reference time
    #[must_use]
    pub fn with_base(mut self, base: DateTime<Utc>) -> Self {
        self.base = base;
        self
    }

    /// Tick `offset_ms` after the reference time
    #[must_use]
    pub fn at(&self, offset_ms: i64, price: f64, volume: f64) -> Tick {
        Tick::new(
            self.code.clone(),
            self.side,
            self.base + Duration::milliseconds(offset_ms),
            price,
            volume,
        )
    }

    /// One tick per price, `step_ms` apart, unit volume
    #[must_use]
    pub fn series(&self, start_ms: i64, step_ms: i64, prices: &[f64]) -> Vec<Tick> {
        (0_i64..)
            .zip(prices)
            .map(|(i, price)| self.at(start_ms + i * step_ms, *price, 1.0))
            .collect()
    }
}

/// Flat candle for container and history tests
#[must_use]
pub fn candle(code: &str, timestamp: DateTime<Utc>, close: f64) -> Candle {
    Candle {
        code: code.to_string(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
        timestamp,
    }
}

/// Factory for order requests
#[derive(Debug, Clone)]
pub struct OrderFactory {
    code: String,
}

impl Default for OrderFactory {
    fn default() -> Self {
        Self::new("KRW-BTC")
    }
}

impl OrderFactory {
    /// Requests for `code`
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// Limit buy request
    #[must_use]
    pub fn buy(&self, size: u64, price: f64) -> OrderRequest {
        OrderRequest::limit(self.code.clone(), OrderSide::Buy, size, price)
    }

    /// Limit sell request
    #[must_use]
    pub fn sell(&self, size: u64, price: f64) -> OrderRequest {
        OrderRequest::limit(self.code.clone(), OrderSide::Sell, size, price)
    }
}

/// Order-state event for `order_id`
#[must_use]
pub fn order_event(order_id: &str, tag: &str) -> OrderEvent {
    OrderEvent::new(order_id, OrderState::from_tag(tag))
}

//! Market data types: ticks, candles and compression settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Side of the book a tick was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickSide {
    /// Ask side
    Ask,
    /// Bid side
    Bid,
}

/// Reasons a tick is rejected before it enters the pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickError {
    /// Tick carries no instrument code
    #[error("Tick has an empty instrument code")]
    EmptyCode,

    /// Price is not a positive finite number
    #[error("Invalid tick price: {price}")]
    InvalidPrice {
        /// Offending price
        price: f64,
    },

    /// Volume is negative or not finite
    #[error("Invalid tick volume: {volume}")]
    InvalidVolume {
        /// Offending volume
        volume: f64,
    },
}

/// Single trade or quote observation for an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument code
    pub code: String,
    /// Book side
    pub side: TickSide,
    /// Exchange timestamp
    pub timestamp: DateTime<Utc>,
    /// Traded or quoted price
    pub price: f64,
    /// Traded or quoted volume
    pub volume: f64,
}

impl Tick {
    /// Create a new tick
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        side: TickSide,
        timestamp: DateTime<Utc>,
        price: f64,
        volume: f64,
    ) -> Self {
        Self {
            code: code.into(),
            side,
            timestamp,
            price,
            volume,
        }
    }

    /// Check that the tick can be routed and aggregated
    pub fn validate(&self) -> Result<(), TickError> {
        if self.code.is_empty() {
            return Err(TickError::EmptyCode);
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(TickError::InvalidPrice { price: self.price });
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(TickError::InvalidVolume {
                volume: self.volume,
            });
        }
        Ok(())
    }
}

/// OHLCV aggregate of one completed time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Instrument code
    pub code: String,
    /// First price in the bucket
    pub open: f64,
    /// Highest price in the bucket
    pub high: f64,
    /// Lowest price in the bucket
    pub low: f64,
    /// Last price in the bucket
    pub close: f64,
    /// Summed volume of the bucket
    pub volume: f64,
    /// Bucket boundary (start for left alignment, end for right)
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    /// OHLC relations every emitted candle must satisfy
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} O:{} H:{} L:{} C:{} V:{}",
            self.code,
            self.timestamp.to_rfc3339(),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume
        )
    }
}

/// Which bucket boundary stamps a candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeAlignment {
    /// Candle timestamp is the bucket start, key = floor(ts / resolution)
    #[default]
    Left,
    /// Candle timestamp is the bucket end, key = ceil(ts / resolution)
    Right,
}

impl fmt::Display for EdgeAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Compression settings of one instrument at one resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompressInfo {
    /// Instrument code
    pub code: String,
    /// Bucket width
    pub resolution: Duration,
    /// Boundary used to stamp candles
    pub alignment: EdgeAlignment,
}

impl CompressInfo {
    /// Create compression settings for an instrument
    #[must_use]
    pub fn new(code: impl Into<String>, resolution: Duration, alignment: EdgeAlignment) -> Self {
        Self {
            code: code.into(),
            resolution,
            alignment,
        }
    }

    /// Bucket width in nanoseconds, saturated to `i64::MAX`
    #[must_use]
    pub fn resolution_nanos(&self) -> i64 {
        i64::try_from(self.resolution.as_nanos()).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for CompressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}ms/{}",
            self.code,
            self.resolution.as_millis(),
            self.alignment
        )
    }
}

//! Data Aggregator Service
//!
//! Routes raw ticks to per-instrument markets and aggregates them into
//! OHLCV candles at every configured resolution:
//! - Market router with lazy, exactly-once market creation per code
//! - Compressors bucketing ticks by resolution and edge alignment
//! - Newest-first candle containers for history and live candles

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compressor;
pub mod config;
pub mod container;
pub mod market;
pub mod router;

pub use compressor::{Compressor, compress};
pub use config::{MarketConfig, ResampleConfig};
pub use container::{CandleContainer, CandleContainers};
pub use market::{CompressedCandle, Market};
pub use router::{MarketRouter, RouteError, RouterStats};

//! Tick to candle compression
//!
//! Ticks are bucketed by `floor(ts / resolution)` (left alignment) or
//! `ceil(ts / resolution)` (right alignment). A candle is emitted when the
//! first tick of a newer bucket arrives; the open bucket is never flushed on
//! its own, not on a gap in ticks and not when the stream ends.

use bus::Shutdown;
use chrono::{DateTime, Utc};
use common::{Candle, CompressInfo, EdgeAlignment, Tick};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Compression state machine for one instrument at one resolution
#[derive(Debug, Clone)]
pub struct Compressor {
    info: CompressInfo,
    resolution: i64,
    open: Option<(i64, Candle)>,
}

impl Compressor {
    /// Create an empty compressor
    #[must_use]
    pub fn new(info: CompressInfo) -> Self {
        let resolution = info.resolution_nanos().max(1);
        Self {
            info,
            resolution,
            open: None,
        }
    }

    /// Compression settings
    #[must_use]
    pub const fn info(&self) -> &CompressInfo {
        &self.info
    }

    /// Candle of the bucket still being filled
    #[must_use]
    pub fn open_candle(&self) -> Option<&Candle> {
        self.open.as_ref().map(|(_, candle)| candle)
    }

    /// Bucket key of a timestamp
    #[must_use]
    pub fn bucket_key(&self, timestamp: DateTime<Utc>) -> i64 {
        let nanos = timestamp.timestamp_nanos_opt().unwrap_or(if timestamp.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        });
        let floor = nanos.div_euclid(self.resolution);
        match self.info.alignment {
            EdgeAlignment::Left => floor,
            EdgeAlignment::Right if nanos.rem_euclid(self.resolution) == 0 => floor,
            EdgeAlignment::Right => floor + 1,
        }
    }

    /// Candle timestamp of a bucket key
    #[must_use]
    pub fn bucket_timestamp(&self, key: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(key.saturating_mul(self.resolution))
    }

    /// Feed one tick; returns the candle it completed, if any
    ///
    /// A tick belonging to a bucket older than the open one is dropped.
    pub fn push(&mut self, tick: &Tick) -> Option<Candle> {
        let key = self.bucket_key(tick.timestamp);

        if let Some((open_key, candle)) = self.open.as_mut() {
            if *open_key == key {
                candle.high = candle.high.max(tick.price);
                candle.low = candle.low.min(tick.price);
                candle.close = tick.price;
                candle.volume += tick.volume;
                return None;
            }
            if key < *open_key {
                warn!(
                    compress = %self.info,
                    tick_ts = %tick.timestamp,
                    "Out-of-order tick dropped"
                );
                return None;
            }
        }

        let candle = Candle {
            code: self.info.code.clone(),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.volume,
            timestamp: self.bucket_timestamp(key),
        };
        self.open.replace((key, candle)).map(|(_, done)| done)
    }
}

/// Compress a tick stream into a candle stream
///
/// The worker stops when the tick stream ends, when the candle reader goes
/// away, or on shutdown. The returned stream cannot be restarted.
pub fn compress(
    mut ticks: mpsc::Receiver<Tick>,
    info: CompressInfo,
    capacity: usize,
    shutdown: Shutdown,
) -> mpsc::Receiver<Candle> {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut compressor = Compressor::new(info);
        loop {
            let tick = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                tick = ticks.recv() => match tick {
                    Some(tick) => tick,
                    None => break,
                },
            };

            let Some(candle) = compressor.push(&tick) else {
                continue;
            };
            debug!(compress = %compressor.info(), candle = %candle, "Candle completed");

            let sent = tokio::select! {
                biased;
                () = shutdown.cancelled() => false,
                sent = tx.send(candle) => sent.is_ok(),
            };
            if !sent {
                break;
            }
        }
        debug!(compress = %compressor.info(), "Compressor stopped");
    });

    rx
}

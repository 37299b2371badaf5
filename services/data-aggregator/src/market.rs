//! Per-instrument routing node
//!
//! A market owns one inbound tick queue and feeds every tick, in order, to
//! one compressor per configured resolution. Completed candles from all
//! compressors are tagged with their compression settings and merged into
//! the router's candle sink.

use crate::compressor::compress;
use crate::config::MarketConfig;
use bus::Shutdown;
use common::{Candle, CompressInfo, Tick};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Candle together with the settings that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedCandle {
    /// Compression settings
    pub info: CompressInfo,
    /// Completed candle
    pub candle: Candle,
}

/// Routing node of one instrument
#[derive(Debug)]
pub struct Market {
    code: String,
    infos: Vec<CompressInfo>,
    ticks: mpsc::Sender<Tick>,
}

impl Market {
    /// Build the compressor set, then start accepting ticks
    ///
    /// Every compressor and candle forwarder exists before the tick queue is
    /// handed out.
    #[must_use]
    pub fn spawn(
        code: &str,
        config: &MarketConfig,
        candles: mpsc::Sender<CompressedCandle>,
        shutdown: &Shutdown,
    ) -> Self {
        let capacity = config.channel_capacity.max(1);
        let infos = config.compress_infos(code);
        let mut inputs = Vec::with_capacity(infos.len());

        for info in &infos {
            let (input, ticks) = mpsc::channel(capacity);
            let output = compress(ticks, info.clone(), capacity, shutdown.clone());
            tokio::spawn(forward(output, info.clone(), candles.clone(), shutdown.clone()));
            inputs.push(input);
        }

        let (ticks, queue) = mpsc::channel(capacity);
        tokio::spawn(fan_out(code.to_string(), queue, inputs, shutdown.clone()));

        Self {
            code: code.to_string(),
            infos,
            ticks,
        }
    }

    /// Instrument code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Compression settings of every compressor
    #[must_use]
    pub fn infos(&self) -> &[CompressInfo] {
        &self.infos
    }

    /// Inbound tick queue
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<Tick> {
        self.ticks.clone()
    }

    /// Market worker is still accepting ticks
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.ticks.is_closed()
    }
}

async fn fan_out(
    code: String,
    mut queue: mpsc::Receiver<Tick>,
    mut inputs: Vec<mpsc::Sender<Tick>>,
    shutdown: Shutdown,
) {
    'ticks: loop {
        let tick = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            tick = queue.recv() => match tick {
                Some(tick) => tick,
                None => break,
            },
        };

        let mut closed = Vec::new();
        for (index, input) in inputs.iter().enumerate() {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break 'ticks,
                sent = input.send(tick.clone()) => {
                    if sent.is_err() {
                        closed.push(index);
                    }
                }
            }
        }

        for index in closed.into_iter().rev() {
            warn!(code = %code, "Compressor input closed");
            inputs.swap_remove(index);
        }
        if inputs.is_empty() {
            warn!(code = %code, "No compressor left, market stopped");
            break;
        }
    }
    debug!(code = %code, "Market stopped");
}

async fn forward(
    mut candles: mpsc::Receiver<Candle>,
    info: CompressInfo,
    sink: mpsc::Sender<CompressedCandle>,
    shutdown: Shutdown,
) {
    loop {
        let candle = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            candle = candles.recv() => match candle {
                Some(candle) => candle,
                None => break,
            },
        };

        let tagged = CompressedCandle {
            info: info.clone(),
            candle,
        };
        let sent = tokio::select! {
            biased;
            () = shutdown.cancelled() => false,
            sent = sink.send(tagged) => sent.is_ok(),
        };
        if !sent {
            break;
        }
    }
    debug!(compress = %info, "Candle forwarder stopped");
}

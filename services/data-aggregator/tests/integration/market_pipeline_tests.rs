//! Multi-resolution market pipeline tests

use bus::Shutdown;
use common::{CompressInfo, EdgeAlignment};
use data_aggregator::{CandleContainers, CompressedCandle, Market, MarketConfig, ResampleConfig};
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_utils::{TEST_TIMEOUT, TickFactory, base_time, init_test_logging};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn config() -> MarketConfig {
    MarketConfig {
        resample: vec![
            ResampleConfig::new(Duration::from_secs(60), EdgeAlignment::Left),
            ResampleConfig::new(Duration::from_secs(120), EdgeAlignment::Left),
        ],
        channel_capacity: 4,
    }
}

async fn collect(candles: &mut mpsc::Receiver<CompressedCandle>, n: usize) -> Vec<CompressedCandle> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(timeout(TEST_TIMEOUT, candles.recv()).await.unwrap().unwrap());
    }
    out
}

#[tokio::test]
async fn resolutions_stay_consistent() {
    init_test_logging();
    let shutdown = Shutdown::new();
    let (sink, mut candles) = mpsc::channel(16);
    let market = Market::spawn("X", &config(), sink, &shutdown);
    assert_eq!(market.infos().len(), 2);
    assert!(market.is_open());

    // Minutes 0..=3 plus one tick in minute 4 to close the second two-minute bucket
    let ticks = TickFactory::new("X");
    let prices = [5.0, 7.0, 3.0, 6.0, 8.0, 2.0, 4.0, 9.0];
    let mut batch = ticks.series(0, 30_000, &prices);
    batch.push(ticks.at(240_000, 1.0, 1.0));
    for tick in batch {
        market.sender().send(tick).await.unwrap();
    }

    // Four one-minute candles and two two-minute candles
    let received = collect(&mut candles, 6).await;
    let (minutes, wide): (Vec<_>, Vec<_>) = received
        .into_iter()
        .partition(|c| c.info.resolution == Duration::from_secs(60));
    assert_eq!(minutes.len(), 4);
    assert_eq!(wide.len(), 2);

    for pair in 0..2 {
        let halves = &minutes[pair * 2..pair * 2 + 2];
        let whole = &wide[pair].candle;
        assert_eq!(whole.open, halves[0].candle.open);
        assert_eq!(whole.close, halves[1].candle.close);
        assert_eq!(whole.high, halves[0].candle.high.max(halves[1].candle.high));
        assert_eq!(whole.low, halves[0].candle.low.min(halves[1].candle.low));
        assert_eq!(whole.volume, halves[0].candle.volume + halves[1].candle.volume);
        assert_eq!(whole.timestamp, halves[0].candle.timestamp);
    }
    assert_eq!(minutes[0].candle.timestamp, base_time());
    shutdown.trigger();
}

#[tokio::test]
async fn live_candles_deduplicate_in_containers() {
    let shutdown = Shutdown::new();
    let (sink, mut candles) = mpsc::channel(16);
    let market = Market::spawn(
        "X",
        &MarketConfig {
            resample: vec![ResampleConfig::default()],
            channel_capacity: 1,
        },
        sink,
        &shutdown,
    );

    let ticks = TickFactory::new("X");
    for tick in ticks.series(0, 60_000, &[1.0, 2.0, 3.0]) {
        market.sender().send(tick).await.unwrap();
    }

    let containers = CandleContainers::new(None);
    for compressed in collect(&mut candles, 2).await {
        assert!(containers.add(&compressed.info, compressed.candle.clone()));
        assert!(!containers.add(&compressed.info, compressed.candle));
    }

    let info = CompressInfo::new("X", Duration::from_secs(60), EdgeAlignment::Left);
    let stored = containers.get(&info).unwrap().values();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].timestamp > stored[1].timestamp);
    shutdown.trigger();
}

#[tokio::test]
async fn market_closes_after_shutdown() {
    let shutdown = Shutdown::new();
    let (sink, _candles) = mpsc::channel(1);
    let market = Market::spawn("X", &MarketConfig::default(), sink, &shutdown);

    shutdown.trigger();
    timeout(TEST_TIMEOUT, async {
        while market.is_open() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

//! Smoke tests against the real providers.
//!
//! Run with `cargo test -p ticker-sources -- --ignored` and the TICKER_*
//! credentials exported.

use std::sync::Arc;
use ticker_common::TickerConfig;
use ticker_sources::{BitcoinAverageFetcher, CoinMarketCapFetcher, RateFetcher, ReqwestTransport};

fn live_config() -> TickerConfig {
    TickerConfig::load(None).expect("environment configuration")
}

#[tokio::test]
#[ignore] // requires network access and BitcoinAverage keys
async fn test_bitcoinaverage_live() {
    // Given
    let config = live_config();
    let transport = Arc::new(ReqwestTransport::new(&config.http).unwrap());
    let fetcher = BitcoinAverageFetcher::new(
        transport,
        config.sources.bitcoinaverage.clone(),
        config.base_symbol.clone(),
    );

    // When
    let table = fetcher.fetch().await.unwrap();

    // Then
    assert!(table.contains("USD"));
    println!("BitcoinAverage returned {} symbols", table.len());
}

#[tokio::test]
#[ignore] // requires network access and a CoinMarketCap key
async fn test_coinmarketcap_live() {
    let config = live_config();
    let transport = Arc::new(ReqwestTransport::new(&config.http).unwrap());
    let fetcher =
        CoinMarketCapFetcher::new(transport, &config.sources.coinmarketcap, config.base_symbol.clone());

    let table = fetcher.fetch().await.unwrap();

    assert!(table.contains("ETH"));
    assert!(!table.contains("USD"));
    println!("CoinMarketCap returned {} symbols", table.len());
}

use crate::bitcoinaverage::BitcoinAverageFetcher;
use crate::coinmarketcap::CoinMarketCapFetcher;
use crate::fetcher::RateFetcher;
use crate::transport::HttpTransport;
use std::sync::Arc;
use ticker_common::config::{BITCOINAVERAGE, COINMARKETCAP};
use ticker_common::{Result, TickerConfig, TickerError};

/// Instantiates the configured sources in `sources.order`, which is also
/// their merge precedence.
pub fn build_fetchers(
    config: &TickerConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Vec<Arc<dyn RateFetcher>>> {
    config
        .sources
        .order
        .iter()
        .map(|name| -> Result<Arc<dyn RateFetcher>> {
            match name.as_str() {
                BITCOINAVERAGE => Ok(Arc::new(BitcoinAverageFetcher::new(
                    transport.clone(),
                    config.sources.bitcoinaverage.clone(),
                    config.base_symbol.clone(),
                ))),
                COINMARKETCAP => Ok(Arc::new(CoinMarketCapFetcher::new(
                    transport.clone(),
                    &config.sources.coinmarketcap,
                    config.base_symbol.clone(),
                ))),
                other => Err(TickerError::Config(format!("unknown source {:?}", other))),
            }
        })
        .collect()
}

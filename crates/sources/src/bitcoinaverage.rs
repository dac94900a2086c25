//! BitcoinAverage: signed fiat and crypto-pair ticker endpoints

use crate::fetcher::RateFetcher;
use crate::price::{invert_price, is_unusable_record, parse_raw_price};
use crate::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use ticker_common::config::BitcoinAverageConfig;
use ticker_common::crypto::signature_header;
use ticker_common::symbols::{canonicalize, is_authoritative};
use ticker_common::{Quote, RateKind, RateTable, Result, TickerError};
use tracing::{debug, info, trace};

const SIGNATURE_HEADER: &str = "X-signature";

/// One ticker entry. Only the price fields and an optional listing id are read.
#[derive(Debug, Deserialize)]
struct TickerEntry {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    ask: Option<Box<RawValue>>,
    #[serde(default)]
    bid: Option<Box<RawValue>>,
    #[serde(default)]
    last: Option<Box<RawValue>>,
}

impl TickerEntry {
    fn fiat_quote(&self) -> Result<Quote> {
        Ok(Quote::new(
            RateKind::Fiat,
            parse_raw_price(self.ask.as_deref())?,
            parse_raw_price(self.bid.as_deref())?,
            parse_raw_price(self.last.as_deref())?,
        ))
    }

    /// Prices inverted into amount of coin per base unit
    fn crypto_quote(&self) -> Result<Quote> {
        Ok(Quote::new(
            RateKind::Crypto,
            invert_price(parse_raw_price(self.ask.as_deref())?)?,
            invert_price(parse_raw_price(self.bid.as_deref())?)?,
            invert_price(parse_raw_price(self.last.as_deref())?)?,
        ))
    }
}

type TickerResponse = BTreeMap<String, TickerEntry>;

/// Fetches both BitcoinAverage endpoints concurrently.
///
/// Fiat entries are keyed `{BASE}{FIAT}` and already priced per base unit.
/// Crypto entries are keyed `{ALT}{BASE}`, priced in base units, and get
/// inverted. If either request fails the whole fetch fails.
pub struct BitcoinAverageFetcher {
    transport: Arc<dyn HttpTransport>,
    config: BitcoinAverageConfig,
    base_symbol: String,
}

impl BitcoinAverageFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: BitcoinAverageConfig,
        base_symbol: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            config,
            base_symbol: base_symbol.into(),
        }
    }

    async fn fetch_endpoint(&self, url: &str) -> Result<TickerResponse> {
        let signature = signature_header(
            &self.config.public_key,
            &self.config.secret_key,
            chrono::Utc::now().timestamp(),
        )?;
        let request = HttpRequest::get(url).header(SIGNATURE_HEADER, signature);

        let body = self.transport.get(request).await?;
        serde_json::from_str(&body).map_err(|e| TickerError::decode(url, e))
    }

    /// `{BASE}{FIAT}` entries, re-keyed to the fiat symbol as-is
    fn collect_fiat(&self, table: &mut RateTable, incoming: TickerResponse) -> Result<()> {
        for (key, entry) in incoming {
            let Some(fiat) = key.strip_prefix(self.base_symbol.as_str()) else {
                continue;
            };
            if fiat.is_empty() {
                continue;
            }

            let quote = match entry.fiat_quote() {
                Ok(quote) => quote,
                Err(e) if is_unusable_record(&e) => {
                    debug!(symbol = fiat, error = %e, "skipping unusable fiat entry");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if quote.is_blank() {
                trace!(symbol = fiat, "skipping blank fiat entry");
                continue;
            }

            table.insert(fiat, quote);
        }
        Ok(())
    }

    /// `{ALT}{BASE}` entries, canonicalized, id-checked and inverted
    fn collect_crypto(&self, table: &mut RateTable, incoming: TickerResponse) -> Result<()> {
        for (key, entry) in incoming {
            let Some(alt) = key.strip_suffix(self.base_symbol.as_str()) else {
                continue;
            };
            if alt.is_empty() {
                continue;
            }

            let symbol = canonicalize(alt);
            if let Some(id) = entry.id {
                if !is_authoritative(symbol, id) {
                    debug!(symbol, id, "dropping colliding ticker");
                    continue;
                }
            }

            let mut quote = match entry.crypto_quote() {
                Ok(quote) => quote,
                Err(e) if is_unusable_record(&e) => {
                    debug!(symbol, error = %e, "skipping unusable crypto entry");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if quote.is_blank() {
                trace!(symbol, "skipping blank crypto entry");
                continue;
            }
            quote.id = entry.id;

            table.insert(symbol, quote);
        }
        Ok(())
    }
}

#[async_trait]
impl RateFetcher for BitcoinAverageFetcher {
    async fn fetch(&self) -> Result<RateTable> {
        info!(source = self.name(), "fetching fiat and crypto tickers");

        // Both requests run to completion before either result is inspected
        let (fiat, crypto) = tokio::join!(
            self.fetch_endpoint(&self.config.fiat_endpoint),
            self.fetch_endpoint(&self.config.crypto_endpoint),
        );
        let (fiat, crypto) = (fiat?, crypto?);

        let mut table = RateTable::new();
        self.collect_fiat(&mut table, fiat)?;
        let fiat_count = table.len();
        self.collect_crypto(&mut table, crypto)?;

        info!(
            source = self.name(),
            fiat = fiat_count,
            total = table.len(),
            "collected tickers"
        );
        Ok(table)
    }

    fn name(&self) -> &str {
        "bitcoinaverage"
    }
}

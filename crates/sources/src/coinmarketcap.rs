//! CoinMarketCap: paginated global listing priced in the base unit

use crate::fetcher::RateFetcher;
use crate::price::{invert_price, is_unusable_record, parse_raw_price};
use crate::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use ticker_common::config::CoinMarketCapConfig;
use ticker_common::symbols::{canonicalize, is_authoritative};
use ticker_common::{Quote, RateKind, RateTable, Result, TickerError};
use tracing::{debug, info, trace, warn};

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";
/// Listing `start` is 1-based
const FIRST_START: usize = 1;

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    data: Vec<ListingRecord>,
}

#[derive(Debug, Deserialize)]
struct ListingRecord {
    id: i64,
    symbol: String,
    #[serde(default)]
    quote: HashMap<String, Option<ListingQuote>>,
}

#[derive(Debug, Deserialize)]
struct ListingQuote {
    #[serde(default)]
    price: Option<Box<RawValue>>,
}

/// Walks the listing endpoint page by page until a short page or the page cap
pub struct CoinMarketCapFetcher {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    api_key: String,
    page_size: usize,
    max_pages: usize,
    banned: HashSet<String>,
    base_symbol: String,
}

impl CoinMarketCapFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: &CoinMarketCapConfig,
        base_symbol: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            banned: config.banned_symbols.iter().cloned().collect(),
            base_symbol: base_symbol.into(),
        }
    }

    async fn fetch_page(&self, start: usize) -> Result<Vec<ListingRecord>> {
        let request = HttpRequest::get(self.endpoint.as_str())
            .query("start", start.to_string())
            .query("limit", self.page_size.to_string())
            .query("convert", self.base_symbol.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header("Accept", "application/json");

        let body = self.transport.get(request).await?;
        let page: ListingResponse = serde_json::from_str(&body)
            .map_err(|e| TickerError::decode(format!("listing page at {}", start), e))?;
        Ok(page.data)
    }

    fn collect(&self, table: &mut RateTable, records: Vec<ListingRecord>) -> Result<()> {
        for record in records {
            let symbol = canonicalize(&record.symbol);

            if !is_authoritative(symbol, record.id) {
                debug!(symbol, id = record.id, "dropping colliding ticker");
                continue;
            }
            if self.banned.contains(symbol) {
                trace!(symbol, "skipping banned symbol");
                continue;
            }

            let raw = record
                .quote
                .get(&self.base_symbol)
                .and_then(Option::as_ref)
                .and_then(|quote| quote.price.as_deref());
            let price = match parse_raw_price(raw).and_then(invert_price) {
                Ok(Some(price)) => price,
                Ok(None) => {
                    trace!(symbol, "skipping listing without price");
                    continue;
                }
                Err(e) if is_unusable_record(&e) => {
                    debug!(symbol, id = record.id, error = %e, "skipping unusable listing");
                    continue;
                }
                Err(e) => return Err(e),
            };

            table.insert(symbol, Quote::flat(RateKind::Crypto, price).with_id(record.id));
        }
        Ok(())
    }
}

#[async_trait]
impl RateFetcher for CoinMarketCapFetcher {
    async fn fetch(&self) -> Result<RateTable> {
        let mut table = RateTable::new();

        for page in 0..self.max_pages {
            let start = FIRST_START + page * self.page_size;
            let records = self.fetch_page(start).await?;
            let received = records.len();
            debug!(source = self.name(), start, received, "listing page");

            self.collect(&mut table, records)?;

            if received < self.page_size {
                info!(source = self.name(), pages = page + 1, total = table.len(), "collected listings");
                return Ok(table);
            }
        }

        warn!(
            source = self.name(),
            max_pages = self.max_pages,
            total = table.len(),
            "listing page cap reached"
        );
        Ok(table)
    }

    fn name(&self) -> &str {
        "coinmarketcap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockHttpTransport;
    use mockall::Sequence;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config(page_size: usize, max_pages: usize) -> CoinMarketCapConfig {
        CoinMarketCapConfig {
            environment: "sandbox".to_string(),
            api_key: "cmc-key".to_string(),
            page_size,
            max_pages,
            banned_symbols: vec!["USD".to_string()],
        }
    }

    fn record(id: i64, symbol: &str, price: &str) -> String {
        format!(
            r#"{{"id": {}, "symbol": "{}", "quote": {{"BTC": {{"price": {}}}}}}}"#,
            id, symbol, price
        )
    }

    fn page(records: &[String]) -> String {
        format!(r#"{{"data": [{}]}}"#, records.join(","))
    }

    fn expect_page(mock: &mut MockHttpTransport, seq: &mut Sequence, start: &'static str, body: String) {
        mock.expect_get()
            .withf(move |request| request.query_value("start") == Some(start))
            .times(1)
            .in_sequence(seq)
            .returning(move |_| Ok(body.clone()));
    }

    #[tokio::test]
    async fn test_short_page_stops_pagination() {
        // Given - page size 3, first page has 2 records
        let mut mock = MockHttpTransport::new();
        let mut seq = Sequence::new();
        expect_page(
            &mut mock,
            &mut seq,
            "1",
            page(&[record(1, "SOIL", "0.0012345"), record(1027, "ETH", "0.05")]),
        );
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(3, 100), "BTC");

        // When
        let table = fetcher.fetch().await.unwrap();

        // Then
        assert_eq!(table.len(), 2);
        let soil = table.get("SOIL").unwrap();
        assert_eq!(soil.last, Some(Decimal::from_str("810.04455245").unwrap()));
        assert_eq!(soil.id, Some(1));
        assert_eq!(table.get("ETH").unwrap().ask, Some(Decimal::from(20)));
    }

    #[tokio::test]
    async fn test_full_page_requests_next_page() {
        // Given - page size 2: a full page, then a short one
        let mut mock = MockHttpTransport::new();
        let mut seq = Sequence::new();
        expect_page(
            &mut mock,
            &mut seq,
            "1",
            page(&[record(1, "SOIL", "0.0012345"), record(1831, "BCH", "0.5")]),
        );
        expect_page(&mut mock, &mut seq, "3", page(&[record(101, "$$$", "0.101")]));
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(2, 100), "BTC");

        // When
        let table = fetcher.fetch().await.unwrap();

        // Then
        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["$$$", "BCH", "SOIL"]);
        assert_eq!(table.get("$$$").unwrap().bid, Some(Decimal::from_str("9.90099009901").unwrap()));
    }

    #[tokio::test]
    async fn test_page_cap_bounds_requests() {
        // Given - an upstream that always returns a full page
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(3)
            .returning(|_| Ok(page(&[record(5, "AAA", "1")])));
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(1, 3), "BTC");

        // When
        let table = fetcher.fetch().await.unwrap();

        // Then
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_collisions_bans_and_aliases() {
        let mut mock = MockHttpTransport::new();
        let mut seq = Sequence::new();
        expect_page(
            &mut mock,
            &mut seq,
            "1",
            page(&[
                record(2224, "ACC", "0.002224"),
                record(2225, "ACC", "0.002225"),
                record(2226, "ACC", "0.002226"),
                record(825, "USD", "0.0001"),
                record(1720, "MIOTA", "0.00102"),
            ]),
        );
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(10, 100), "BTC");

        let table = fetcher.fetch().await.unwrap();

        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["ACC", "IOTA"]);
        let acc = table.get("ACC").unwrap();
        assert_eq!(acc.id, Some(2225));
        assert_eq!(acc.ask, Some(Decimal::from_str("449.438202247").unwrap()));
    }

    #[tokio::test]
    async fn test_missing_or_empty_price_is_skipped() {
        let mut mock = MockHttpTransport::new();
        let mut seq = Sequence::new();
        expect_page(
            &mut mock,
            &mut seq,
            "1",
            page(&[
                record(7, "NUL", "null"),
                record(8, "EMP", r#""""#),
                r#"{"id": 9, "symbol": "NOQ", "quote": {}}"#.to_string(),
                record(10, "ZRO", "0"),
            ]),
        );
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(10, 100), "BTC");

        let table = fetcher.fetch().await.unwrap();

        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["ZRO"]);
        assert_eq!(table.get("ZRO").unwrap().last, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_unrepresentable_price_skips_only_that_listing() {
        // Given - one listing too small for a decimal, one that would round to zero
        let mut mock = MockHttpTransport::new();
        let mut seq = Sequence::new();
        expect_page(
            &mut mock,
            &mut seq,
            "1",
            page(&[
                record(11, "DUST", "1e-29"),
                record(12, "MOTE", r#""0.00000000000000000000000000001234""#),
                record(1027, "ETH", "0.05"),
            ]),
        );
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(10, 100), "BTC");

        // When
        let table = fetcher.fetch().await.unwrap();

        // Then
        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["ETH"]);
    }

    #[tokio::test]
    async fn test_null_quote_is_skipped_like_missing_price() {
        let mut mock = MockHttpTransport::new();
        let mut seq = Sequence::new();
        expect_page(
            &mut mock,
            &mut seq,
            "1",
            page(&[
                r#"{"id": 13, "symbol": "NQT", "quote": {"BTC": null}}"#.to_string(),
                record(1831, "BCH", "0.5"),
            ]),
        );
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(10, 100), "BTC");

        let table = fetcher.fetch().await.unwrap();

        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["BCH"]);
    }

    #[tokio::test]
    async fn test_request_carries_key_and_paging() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|request| {
                request.url == "https://sandbox-api.coinmarketcap.com/v1/cryptocurrency/listings/latest"
                    && request.query_value("limit") == Some("50")
                    && request.query_value("convert") == Some("BTC")
                    && request.header_value(API_KEY_HEADER) == Some("cmc-key")
            })
            .times(1)
            .returning(|_| Ok(r#"{"data": []}"#.to_string()));
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(50, 100), "BTC");

        assert!(fetcher.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_page_fails_the_fetch() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get().times(1).returning(|request| {
            Err(TickerError::Transport {
                url: request.url,
                message: "connection reset".to_string(),
            })
        });
        let fetcher = CoinMarketCapFetcher::new(Arc::new(mock), &config(5, 100), "BTC");

        assert!(matches!(fetcher.fetch().await, Err(TickerError::Transport { .. })));
    }
}

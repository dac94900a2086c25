use async_trait::async_trait;
use ticker_common::{RateTable, Result};

/// A single upstream provider.
///
/// Credentials and paging are bound at construction; `fetch` returns that
/// provider's rates already keyed by canonical symbol and oriented as amount
/// of symbol per base unit.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch(&self) -> Result<RateTable>;

    /// Source name used in logs and errors
    fn name(&self) -> &str;
}

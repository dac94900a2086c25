//! Upstream rate providers and their shared plumbing

pub mod bitcoinaverage;
pub mod coinmarketcap;
pub mod fetcher;
pub mod price;
pub mod registry;
pub mod transport;

pub use bitcoinaverage::BitcoinAverageFetcher;
pub use coinmarketcap::CoinMarketCapFetcher;
pub use fetcher::RateFetcher;
pub use price::{invert_and_format, invert_price};
pub use registry::build_fetchers;
pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};

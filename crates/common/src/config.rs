//! Process configuration: TOML file, then environment overrides

use crate::error::{Result, TickerError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const BITCOINAVERAGE: &str = "bitcoinaverage";
pub const COINMARKETCAP: &str = "coinmarketcap";

/// Sources this build knows how to construct
pub const KNOWN_SOURCES: [&str; 2] = [BITCOINAVERAGE, COINMARKETCAP];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Reference currency every rate is expressed against
    pub base_symbol: String,
    /// Symbols a snapshot must contain to be published
    pub required_symbols: Vec<String>,
    /// Directory the file writer publishes `rates` and `whitelist` into
    pub out_path: PathBuf,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
    pub serve: ServeConfig,
    pub object_store: ObjectStoreConfig,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            base_symbol: "BTC".to_string(),
            required_symbols: vec!["BTC".to_string(), "USD".to_string()],
            out_path: PathBuf::from("./"),
            log_filter: "info".to_string(),
            http: HttpConfig::default(),
            sources: SourcesConfig::default(),
            serve: ServeConfig::default(),
            object_store: ObjectStoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: "rate-ticker/0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Fetchers to run. Later entries override earlier ones when merging.
    pub order: Vec<String>,
    pub bitcoinaverage: BitcoinAverageConfig,
    pub coinmarketcap: CoinMarketCapConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order: vec![BITCOINAVERAGE.to_string(), COINMARKETCAP.to_string()],
            bitcoinaverage: BitcoinAverageConfig::default(),
            coinmarketcap: CoinMarketCapConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BitcoinAverageConfig {
    pub public_key: String,
    pub secret_key: String,
    pub fiat_endpoint: String,
    pub crypto_endpoint: String,
}

impl Default for BitcoinAverageConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            fiat_endpoint: "https://apiv2.bitcoinaverage.com/indices/global/ticker/all?crypto=BTC"
                .to_string(),
            crypto_endpoint: "https://apiv2.bitcoinaverage.com/indices/crypto/ticker/all"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoinMarketCapConfig {
    /// Host prefix: `pro` for production, `sandbox` for the test API
    pub environment: String,
    pub api_key: String,
    pub page_size: usize,
    /// Hard cap on requested pages per fetch
    pub max_pages: usize,
    /// Listing entries never published, checked after canonicalization
    pub banned_symbols: Vec<String>,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            environment: "pro".to_string(),
            api_key: String::new(),
            page_size: 5000,
            max_pages: 100,
            banned_symbols: vec!["USD".to_string()],
        }
    }
}

impl CoinMarketCapConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}-api.coinmarketcap.com/v1/cryptocurrency/listings/latest",
            self.environment
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub listen_addr: String,
    pub poll_interval_secs: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            poll_interval_secs: 900,
        }
    }
}

/// S3 bucket the `fetch` command also publishes to. Empty bucket disables it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub region: String,
    pub bucket: String,
}

impl ObjectStoreConfig {
    pub fn is_enabled(&self) -> bool {
        !self.bucket.is_empty()
    }
}

impl TickerConfig {
    /// Reads the optional TOML file, applies process environment overrides
    /// and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TickerError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| TickerError::Config(e.to_string()))
    }

    /// Overrides fields from the environment. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("TICKER_BASE_SYMBOL") {
            self.base_symbol = v.trim().to_string();
        }
        if let Some(v) = var("TICKER_REQUIRED_SYMBOLS") {
            self.required_symbols = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = var("TICKER_OUT_PATH") {
            self.out_path = PathBuf::from(v);
        }
        if let Some(v) = var("TICKER_LOG") {
            self.log_filter = v;
        }
        if let Some(secs) = var("TICKER_HTTP_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.http.request_timeout_secs = secs;
        }
        if let Some(v) = var("TICKER_BTCAVG_PUBKEY") {
            self.sources.bitcoinaverage.public_key = v;
        }
        if let Some(v) = var("TICKER_BTCAVG_PRIVKEY") {
            self.sources.bitcoinaverage.secret_key = v;
        }
        if let Some(v) = var("TICKER_CMC_ENV") {
            self.sources.coinmarketcap.environment = v;
        }
        if let Some(v) = var("TICKER_CMC_API_KEY") {
            self.sources.coinmarketcap.api_key = v;
        }
        if let Some(v) = var("TICKER_LISTEN_ADDR") {
            self.serve.listen_addr = v;
        }
        if let Some(secs) = var("TICKER_POLL_INTERVAL_SECS").and_then(|v| v.trim().parse().ok()) {
            self.serve.poll_interval_secs = secs;
        }
        if let Some(v) = var("AWS_S3_REGION") {
            self.object_store.region = v.trim().to_string();
        }
        if let Some(v) = var("AWS_S3_BUCKET") {
            self.object_store.bucket = v.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_symbol.is_empty() {
            return Err(TickerError::Config("base_symbol must not be empty".into()));
        }
        if self.sources.order.is_empty() {
            return Err(TickerError::Config("sources.order must name at least one source".into()));
        }
        if let Some(unknown) = self
            .sources
            .order
            .iter()
            .find(|name| !KNOWN_SOURCES.contains(&name.as_str()))
        {
            return Err(TickerError::Config(format!("unknown source {:?}", unknown)));
        }
        if self.sources.coinmarketcap.page_size == 0 {
            return Err(TickerError::Config("coinmarketcap.page_size must be positive".into()));
        }
        if self.sources.coinmarketcap.max_pages == 0 {
            return Err(TickerError::Config("coinmarketcap.max_pages must be positive".into()));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(TickerError::Config("http.request_timeout_secs must be positive".into()));
        }
        if self.serve.poll_interval_secs == 0 {
            return Err(TickerError::Config("serve.poll_interval_secs must be positive".into()));
        }
        if self.object_store.is_enabled() && self.object_store.region.is_empty() {
            return Err(TickerError::Config("object_store.region is required with a bucket".into()));
        }
        Ok(())
    }
}

//! Error taxonomy shared by every stage of the aggregation pipeline

use thiserror::Error;

/// Errors raised while fetching, merging, validating or publishing rates.
///
/// Ticker collisions are deliberately absent: a record whose id does not
/// match the pinned id is dropped, never reported.
#[derive(Debug, Error)]
pub enum TickerError {
    /// The upstream could not be reached or the body could not be read
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The upstream answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// An upstream payload did not have the expected shape
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A price field was present but is not a decimal number
    #[error("invalid price {value:?}: {reason}")]
    InvalidPrice { value: String, reason: String },

    /// A well-formed price too large or too small for the decimal range.
    /// Only the record carrying it is dropped.
    #[error("price {0:?} is outside the representable decimal range")]
    UnrepresentablePrice(String),

    #[error("request signing failed: {0}")]
    Signing(String),

    /// The merged table lacks a symbol the snapshot must contain
    #[error("Missing required symbol: {0}")]
    MissingRequiredSymbol(String),

    #[error("writer {sink} failed: {source}")]
    Writer {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    /// A remote sink rejected an upload
    #[error("upload to {sink} failed: {source}")]
    Upload {
        sink: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A fetcher task panicked or was cancelled before it could report
    #[error("fetch task {name} did not complete: {message}")]
    Task { name: String, message: String },
}

impl TickerError {
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_price(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPrice {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TickerError>;

//! Common types and utilities shared across the rate ticker components

pub mod config;
pub mod crypto;
pub mod error;
pub mod symbols;
pub mod types;

pub use config::TickerConfig;
pub use error::*;
pub use types::*;

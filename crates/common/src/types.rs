//! Rate table data model

use crate::error::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Whether a symbol is a national currency or a coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKind {
    Fiat,
    Crypto,
}

impl std::fmt::Display for RateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateKind::Fiat => write!(f, "fiat"),
            RateKind::Crypto => write!(f, "crypto"),
        }
    }
}

/// One price observation, expressed as amount of symbol per base unit.
///
/// `None` in a price field means the provider had no data for it and goes on
/// the wire as `""`. Decimals are serialized as strings so no precision is
/// lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, with = "price_field")]
    pub ask: Option<Decimal>,
    #[serde(default, with = "price_field")]
    pub bid: Option<Decimal>,
    #[serde(default, with = "price_field")]
    pub last: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: RateKind,
}

/// Price fields are a decimal string, or `""` when absent. Reading also
/// accepts plain JSON numbers and `null`.
mod price_field {
    use rust_decimal::Decimal;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(Decimal),
    }

    pub fn serialize<S: Serializer>(price: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
        match price {
            Some(price) => Serialize::serialize(price, serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(price)) => Ok(Some(price)),
            Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Raw::Text(text)) => Decimal::from_str(text.trim()).map(Some).map_err(de::Error::custom),
        }
    }
}

impl Quote {
    pub fn new(kind: RateKind, ask: Option<Decimal>, bid: Option<Decimal>, last: Option<Decimal>) -> Self {
        Self {
            id: None,
            ask,
            bid,
            last,
            kind,
        }
    }

    /// The same price on all three fields
    pub fn flat(kind: RateKind, price: Decimal) -> Self {
        Self::new(kind, Some(price), Some(price), Some(price))
    }

    /// The base unit priced against itself
    pub fn unit() -> Self {
        Self::flat(RateKind::Crypto, Decimal::ONE)
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// True when none of ask, bid or last carries data
    pub fn is_blank(&self) -> bool {
        self.ask.is_none() && self.bid.is_none() && self.last.is_none()
    }
}

/// Canonical symbol to quote mapping.
///
/// Backed by a `BTreeMap` so serialization order, and therefore the snapshot
/// bytes, only depend on the contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    rates: BTreeMap<String, Quote>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the quote for `symbol`, returning the replaced one
    pub fn insert(&mut self, symbol: impl Into<String>, quote: Quote) -> Option<Quote> {
        self.rates.insert(symbol.into(), quote)
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.rates.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.rates.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Quote> {
        self.rates.iter()
    }
}

impl IntoIterator for RateTable {
    type Item = (String, Quote);
    type IntoIter = btree_map::IntoIter<String, Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.rates.into_iter()
    }
}

impl<'a> IntoIterator for &'a RateTable {
    type Item = (&'a String, &'a Quote);
    type IntoIter = btree_map::Iter<'a, String, Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.rates.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Quote)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (S, Quote)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().map(|(s, q)| (s.into(), q)).collect(),
        }
    }
}

/// The published result of one aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    table: RateTable,
}

impl Snapshot {
    /// Wraps a merged table, pinning the base unit to its unit quote
    pub fn new(base_symbol: impl Into<String>, mut table: RateTable) -> Self {
        table.insert(base_symbol, Quote::unit());
        Self { table }
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// Canonical JSON bytes handed to every writer
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.table)?)
    }
}

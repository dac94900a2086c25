//! Upstream price parsing and the inversion transform
//!
//! Prices never pass through binary floating point. Raw JSON text is parsed
//! straight into `Decimal`, and reciprocals are computed in `Decimal` and
//! rounded to [`INVERSION_SIGNIFICANT_DIGITS`] before being normalized, so the
//! same input always yields the same digits.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::value::RawValue;
use std::str::FromStr;
use ticker_common::{Result, TickerError};

/// Significant digits kept after inverting a price
pub const INVERSION_SIGNIFICANT_DIGITS: u32 = 12;

/// Parses decimal text in plain or scientific notation.
/// Blank text means the provider had no data.
///
/// A well-formed number that `Decimal` cannot hold, or a non-zero number that
/// would round to zero, is [`TickerError::UnrepresentablePrice`].
pub fn parse_price_text(text: &str) -> Result<Option<Decimal>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    match Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
        Ok(price) if price.is_zero() && has_nonzero_digit(text) => {
            Err(TickerError::UnrepresentablePrice(text.to_string()))
        }
        Ok(price) => Ok(Some(price)),
        Err(_) if is_finite_number(text) && !has_nonzero_digit(text) => Ok(Some(Decimal::ZERO)),
        Err(_) if is_finite_number(text) => Err(TickerError::UnrepresentablePrice(text.to_string())),
        Err(e) => Err(TickerError::invalid_price(text, e.to_string())),
    }
}

/// Whether the mantissa of `text` has any digit other than zero
fn has_nonzero_digit(text: &str) -> bool {
    text.split(['e', 'E'])
        .next()
        .is_some_and(|mantissa| mantissa.bytes().any(|b| (b'1'..=b'9').contains(&b)))
}

/// Syntax check only; the value itself is never used
fn is_finite_number(text: &str) -> bool {
    text.parse::<f64>().is_ok_and(f64::is_finite)
}

/// True for errors that disqualify one record rather than the whole payload
pub fn is_unusable_record(err: &TickerError) -> bool {
    matches!(err, TickerError::UnrepresentablePrice(_))
}

/// Parses a raw JSON price field, which may be a number, a string, an empty
/// string, `null`, or missing entirely.
pub fn parse_raw_price(raw: Option<&RawValue>) -> Result<Option<Decimal>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match raw.get().trim() {
        "null" => Ok(None),
        quoted if quoted.starts_with('"') => {
            let text: String = serde_json::from_str(quoted)
                .map_err(|e| TickerError::decode("price string", e))?;
            parse_price_text(&text)
        }
        number => parse_price_text(number),
    }
}

/// Converts "base per unit of symbol" into "symbol per base unit" or back.
///
/// Absent stays absent and zero stays zero; anything else becomes its
/// reciprocal rounded to [`INVERSION_SIGNIFICANT_DIGITS`].
pub fn invert_price(price: Option<Decimal>) -> Result<Option<Decimal>> {
    let Some(price) = price else {
        return Ok(None);
    };
    if price.is_zero() {
        return Ok(Some(Decimal::ZERO));
    }

    Decimal::ONE
        .checked_div(price)
        .filter(|inverse| !inverse.is_zero())
        .and_then(|inverse| {
            inverse.round_sf_with_strategy(
                INVERSION_SIGNIFICANT_DIGITS,
                RoundingStrategy::MidpointAwayFromZero,
            )
        })
        .map(|inverse| Some(inverse.normalize()))
        .ok_or_else(|| TickerError::UnrepresentablePrice(price.to_string()))
}

/// String form of [`invert_price`]: `""` maps to `""` and `"0"` to `"0"`
pub fn invert_and_format(price: &str) -> Result<String> {
    Ok(invert_price(parse_price_text(price)?)?
        .map(|inverse| inverse.to_string())
        .unwrap_or_default())
}

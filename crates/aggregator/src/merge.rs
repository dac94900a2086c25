use ticker_common::{Quote, RateTable, Result, TickerError};

/// Merges provider tables in order on top of the base unit entry.
///
/// A symbol present in several tables takes the whole quote of the last table
/// that has it; fields are never combined.
pub fn merge_tables<I>(base_symbol: &str, tables: I) -> RateTable
where
    I: IntoIterator<Item = RateTable>,
{
    let mut merged = RateTable::new();
    merged.insert(base_symbol, Quote::unit());

    for table in tables {
        for (symbol, quote) in table {
            merged.insert(symbol, quote);
        }
    }
    merged
}

/// Fails on the first required symbol, in the given order, missing from `table`
pub fn validate_required<S: AsRef<str>>(table: &RateTable, required: &[S]) -> Result<()> {
    for symbol in required {
        let symbol: &str = symbol.as_ref();
        if !table.contains(symbol) {
            return Err(TickerError::MissingRequiredSymbol(symbol.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use ticker_common::RateKind;

    fn table(entries: &[(&str, i64)]) -> RateTable {
        entries
            .iter()
            .map(|(symbol, price)| (*symbol, Quote::flat(RateKind::Crypto, Decimal::from(*price))))
            .collect()
    }

    #[test]
    fn test_later_table_wins() {
        // Given
        let a = table(&[("ETH", 10), ("LTC", 100)]);
        let b = table(&[("ETH", 20)]);

        // When
        let ab = merge_tables("BTC", vec![a.clone(), b.clone()]);
        let ba = merge_tables("BTC", vec![b, a]);

        // Then
        assert_eq!(ab.get("ETH").unwrap().ask, Some(Decimal::from(20)));
        assert_eq!(ba.get("ETH").unwrap().ask, Some(Decimal::from(10)));
        assert_eq!(ab.get("LTC"), ba.get("LTC"));
    }

    #[test]
    fn test_whole_quote_is_replaced() {
        let mut a = RateTable::new();
        a.insert("EUR", Quote::new(RateKind::Fiat, Some(Decimal::ONE), Some(Decimal::ONE), Some(Decimal::ONE)));
        let mut b = RateTable::new();
        b.insert("EUR", Quote::new(RateKind::Fiat, None, Some(Decimal::TWO), None));

        let merged = merge_tables("BTC", vec![a, b]);

        let eur = merged.get("EUR").unwrap();
        assert_eq!((eur.ask, eur.bid, eur.last), (None, Some(Decimal::TWO), None));
    }

    #[test]
    fn test_empty_merge_holds_only_base_unit() {
        let merged = merge_tables("BTC", Vec::new());

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("BTC"), Some(&Quote::unit()));
    }

    #[test]
    fn test_validation_names_first_missing_symbol() {
        let merged = merge_tables("BTC", vec![table(&[("ETH", 10)])]);

        let err = validate_required(&merged, &["BTC", "USD", "EUR"]).unwrap_err();

        assert!(matches!(err, TickerError::MissingRequiredSymbol(ref s) if s == "USD"));
    }

    #[test]
    fn test_validation_passes_when_all_present() {
        let merged = merge_tables("BTC", vec![table(&[("USD", 30_000)])]);

        assert!(validate_required(&merged, &["BTC".to_string(), "USD".to_string()]).is_ok());
        assert!(validate_required::<&str>(&merged, &[]).is_ok());
    }

    proptest! {
        #[test]
        fn prop_last_writer_wins(first in 1i64..1000, second in 1i64..1000) {
            let merged = merge_tables("BTC", vec![table(&[("S", first)]), table(&[("S", second)])]);
            prop_assert_eq!(merged.get("S").unwrap().last, Some(Decimal::from(second)));
        }
    }
}

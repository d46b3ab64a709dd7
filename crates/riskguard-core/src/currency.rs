//! Symbol-to-currency derivation.
//!
//! The mapping is a heuristic over the symbol name, not a lookup against
//! instrument metadata, so it sits behind a trait and can be replaced with a
//! proper symbol registry without touching the enforcement logic.

use std::collections::BTreeSet;

/// Derives the set of currencies an instrument symbol is exposed to.
pub trait CurrencyMapper: Send + Sync {
    /// Currencies for `symbol`. May be empty for unmappable names.
    fn currencies(&self, symbol: &str) -> BTreeSet<String>;
}

/// Default heuristic mapper.
///
/// Six-letter alphabetic symbols (optionally suffixed, e.g. "EURUSD.m") are
/// split 3/3 into a currency pair; anything shorter falls back to its last
/// three characters as a single entry. Exotic symbol formats inherit the
/// fallback's failure mode ("US30" maps to {"S30"}).
#[derive(Debug, Clone, Copy, Default)]
pub struct PairSplitMapper;

impl CurrencyMapper for PairSplitMapper {
    fn currencies(&self, symbol: &str) -> BTreeSet<String> {
        let s = symbol.to_ascii_uppercase();
        let bytes = s.as_bytes();
        if bytes.len() >= 6 && bytes[..6].iter().all(|b| b.is_ascii_alphabetic()) {
            return BTreeSet::from([s[..3].to_string(), s[3..6].to_string()]);
        }
        let start = s.len().saturating_sub(3);
        // Exotic multi-byte names fall back to the whole (uppercased) symbol.
        let tail = s.get(start..).unwrap_or(&s).to_string();
        BTreeSet::from([tail])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pair_symbol_splits() {
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies("EURUSD"), set(&["EUR", "USD"]));
    }

    #[test]
    fn test_suffixed_pair_symbol_splits() {
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies("GBPJPY.m"), set(&["GBP", "JPY"]));
    }

    #[test]
    fn test_lowercase_input_is_normalized() {
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies("eurusd"), set(&["EUR", "USD"]));
    }

    #[test]
    fn test_short_symbol_falls_back_to_tail() {
        // Scenario E: "XAU" derives {"XAU"} via the fallback rule.
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies("XAU"), set(&["XAU"]));
    }

    #[test]
    fn test_index_symbol_keeps_heuristic_failure_mode() {
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies("US30"), set(&["S30"]));
    }

    #[test]
    fn test_numeric_six_char_symbol_uses_fallback() {
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies("DE40.c"), set(&["0.C"]));
    }

    #[test]
    fn test_empty_symbol_yields_empty_currency() {
        let mapper = PairSplitMapper;
        assert_eq!(mapper.currencies(""), set(&[""]));
    }
}

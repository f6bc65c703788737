// Filter implementations for screener
use std::collections::HashSet;

use crate::models::Instrument;
use crate::screener::Filter;

/// Символ котируется в нужной валюте (BTCUSDT -> USDT)
pub struct QuoteAssetFilter {
    quote: String,
}

impl QuoteAssetFilter {
    pub fn new(quote: &str) -> Self {
        QuoteAssetFilter { quote: quote.to_ascii_uppercase() }
    }
}

impl Filter for QuoteAssetFilter {
    fn check(&self, instrument: &Instrument) -> bool {
        instrument.symbol.len() > self.quote.len() && instrument.symbol.ends_with(&self.quote)
    }
}

pub struct VolumeFilter {
    min_volume: f64,
}

impl VolumeFilter {
    pub fn new(min_volume: f64) -> Self {
        VolumeFilter { min_volume }
    }
}

impl Filter for VolumeFilter {
    fn check(&self, instrument: &Instrument) -> bool {
        instrument.quote_volume >= self.min_volume
    }
}

/// Только бессрочные контракты в статусе TRADING
pub struct TradableFilter;

impl Filter for TradableFilter {
    fn check(&self, instrument: &Instrument) -> bool {
        instrument.tradable
    }
}

/// Черный список символов
pub struct ExcludeFilter {
    symbols: HashSet<String>,
}

impl ExcludeFilter {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ExcludeFilter {
            symbols: symbols.into_iter().map(|s| s.as_ref().to_ascii_uppercase()).collect(),
        }
    }
}

impl Filter for ExcludeFilter {
    fn check(&self, instrument: &Instrument) -> bool {
        !self.symbols.contains(&instrument.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(symbol: &str, quote_volume: f64, tradable: bool) -> Instrument {
        Instrument { symbol: symbol.to_string(), quote_volume, tradable }
    }

    #[test]
    fn test_quote_asset_filter() {
        let filter = QuoteAssetFilter::new("usdt");
        assert!(filter.check(&instrument("BTCUSDT", 1.0, true)));
        assert!(!filter.check(&instrument("BTCUSDC", 1.0, true)));
        assert!(!filter.check(&instrument("USDT", 1.0, true)));
    }

    #[test]
    fn test_volume_filter() {
        let filter = VolumeFilter::new(1_000_000.0);
        assert!(filter.check(&instrument("BTCUSDT", 1_000_000.0, true)));
        assert!(!filter.check(&instrument("BTCUSDT", 999_999.0, true)));
    }

    #[test]
    fn test_tradable_and_exclude_filters() {
        assert!(!TradableFilter.check(&instrument("OLDUSDT", 10.0, false)));

        let exclude = ExcludeFilter::new(["usdcusdt"]);
        assert!(!exclude.check(&instrument("USDCUSDT", 10.0, true)));
        assert!(exclude.check(&instrument("BTCUSDT", 10.0, true)));
    }
}

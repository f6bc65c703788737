pub mod filters;

#[cfg(feature = "live")]
pub mod scanner;

use std::collections::HashSet;

use crate::models::Instrument;
use crate::utils::config::UniverseConfig;
use filters::{ExcludeFilter, QuoteAssetFilter, TradableFilter, VolumeFilter};

/// Отбор вселенной инструментов: фильтры, затем сортировка по объему и top-N
pub struct Screener {
    filters: Vec<Box<dyn Filter>>,
    top_n: Option<usize>,
}

pub trait Filter: Send + Sync {
    fn check(&self, instrument: &Instrument) -> bool;
}

impl Default for Screener {
    fn default() -> Self {
        Self::new()
    }
}

impl Screener {
    pub fn new() -> Self {
        Screener {
            filters: Vec::new(),
            top_n: None,
        }
    }

    pub fn from_config(config: &UniverseConfig) -> Self {
        let mut screener = Screener::new().with_top_n(config.top_n);
        screener.add_filter(Box::new(QuoteAssetFilter::new(&config.quote_asset)));
        if config.perpetual_only {
            screener.add_filter(Box::new(TradableFilter));
        }
        if config.min_quote_volume > 0.0 {
            screener.add_filter(Box::new(VolumeFilter::new(config.min_quote_volume)));
        }
        if !config.exclude.is_empty() {
            screener.add_filter(Box::new(ExcludeFilter::new(&config.exclude)));
        }
        screener
    }

    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn with_top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = top_n;
        self
    }

    /// Символы по убыванию 24h объема, без дублей
    pub fn select(&self, instruments: Vec<Instrument>) -> Vec<Instrument> {
        let mut selected: Vec<Instrument> = instruments
            .into_iter()
            .filter(|instrument| self.filters.iter().all(|f| f.check(instrument)))
            .collect();

        selected.sort_by(|a, b| b.quote_volume.total_cmp(&a.quote_volume));

        let mut seen = HashSet::new();
        selected.retain(|instrument| seen.insert(instrument.symbol.clone()));

        if let Some(n) = self.top_n {
            selected.truncate(n);
        }
        selected
    }
}

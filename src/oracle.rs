//! Price oracle contract and the in-memory store backing it
//!
//! Lookup semantics: the most recent observation on or before the requested
//! date that actually carries the requested field. The fallback lets callers
//! tolerate weekends, holidays, and partial rows in the source data.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::PriceError;
use crate::types::{PriceBar, PriceKind, Symbol};

/// Read-only price lookup, injected into the clock and accounting engine
pub trait PriceOracle: Send + Sync {
    /// Price of `kind` for `symbol` effective on or before `date`
    fn price(&self, symbol: &Symbol, date: NaiveDate, kind: PriceKind) -> Result<f64, PriceError>;

    /// Every symbol with at least one tracked observation
    fn symbols(&self) -> Vec<Symbol>;

    /// Distinct observation dates across all tracked symbols, in no
    /// particular order
    fn observed_dates(&self) -> Vec<NaiveDate>;

    /// Full ascending series for a symbol
    fn series(&self, symbol: &Symbol) -> Result<Vec<PriceBar>, PriceError>;
}

/// In-memory price store keyed by symbol
///
/// Each series is kept ascending by date with unique dates; inserting a bar
/// for an existing (symbol, date) replaces it.
#[derive(Debug, Default)]
pub struct PriceStore {
    series: HashMap<Symbol, Vec<PriceBar>>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one observation, replacing any bar already on that date
    pub fn insert(&mut self, symbol: Symbol, bar: PriceBar) {
        let series = self.series.entry(symbol).or_default();
        match series.binary_search_by_key(&bar.date, |b| b.date) {
            Ok(i) => series[i] = bar,
            Err(i) => series.insert(i, bar),
        }
    }

    /// Insert a whole series for a symbol
    pub fn insert_series(&mut self, symbol: Symbol, bars: Vec<PriceBar>) {
        for bar in bars {
            self.insert(symbol.clone(), bar);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }
}

impl PriceOracle for PriceStore {
    fn price(&self, symbol: &Symbol, date: NaiveDate, kind: PriceKind) -> Result<f64, PriceError> {
        let series = self
            .series
            .get(symbol)
            .ok_or_else(|| PriceError::UnknownSymbol(symbol.clone()))?;

        // Walk backwards from the latest bar on or before `date` until one
        // carries the requested field.
        let end = series.partition_point(|b| b.date <= date);
        series[..end]
            .iter()
            .rev()
            .find_map(|b| b.field(kind))
            .ok_or(PriceError::NoPriceOnOrBefore {
                symbol: symbol.clone(),
                date,
            })
    }

    fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.series.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn observed_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .series
            .values()
            .flat_map(|bars| bars.iter().map(|b| b.date))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    fn series(&self, symbol: &Symbol) -> Result<Vec<PriceBar>, PriceError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| PriceError::UnknownSymbol(symbol.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, open: Option<f64>, close: Option<f64>) -> PriceBar {
        PriceBar {
            date,
            open,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    fn sample_store() -> PriceStore {
        let mut store = PriceStore::new();
        store.insert_series(
            Symbol::new("AAPL"),
            vec![
                bar(d(2024, 1, 2), Some(100.0), Some(101.0)),
                bar(d(2024, 1, 3), Some(102.0), Some(103.0)),
                bar(d(2024, 1, 8), Some(110.0), Some(111.0)),
            ],
        );
        store
    }

    #[test]
    fn test_exact_date_lookup() {
        let store = sample_store();
        let price = store
            .price(&Symbol::new("AAPL"), d(2024, 1, 3), PriceKind::Open)
            .unwrap();
        assert_eq!(price, 102.0);
    }

    #[test]
    fn test_falls_back_to_most_recent_prior_date() {
        let store = sample_store();
        // Jan 5 is a gap; Jan 3 is the latest observation on or before it
        let price = store
            .price(&Symbol::new("AAPL"), d(2024, 1, 5), PriceKind::Close)
            .unwrap();
        assert_eq!(price, 103.0);
    }

    #[test]
    fn test_no_data_before_first_observation() {
        let store = sample_store();
        let err = store
            .price(&Symbol::new("AAPL"), d(2023, 12, 29), PriceKind::Open)
            .unwrap_err();
        assert!(matches!(err, PriceError::NoPriceOnOrBefore { .. }));
    }

    #[test]
    fn test_unknown_symbol() {
        let store = sample_store();
        let err = store
            .price(&Symbol::new("ZZZZ"), d(2024, 1, 3), PriceKind::Open)
            .unwrap_err();
        assert_eq!(err, PriceError::UnknownSymbol(Symbol::new("ZZZZ")));
    }

    #[test]
    fn test_missing_field_falls_back_to_earlier_bar() {
        let mut store = sample_store();
        // Jan 9 row has a close but no open; an open lookup should fall
        // back to Jan 8.
        store.insert(
            Symbol::new("AAPL"),
            bar(d(2024, 1, 9), None, Some(112.0)),
        );
        let price = store
            .price(&Symbol::new("AAPL"), d(2024, 1, 9), PriceKind::Open)
            .unwrap();
        assert_eq!(price, 110.0);
    }

    #[test]
    fn test_insert_replaces_same_date_bar() {
        let mut store = sample_store();
        store.insert(
            Symbol::new("AAPL"),
            bar(d(2024, 1, 3), Some(200.0), Some(201.0)),
        );
        let series = store.series(&Symbol::new("AAPL")).unwrap();
        assert_eq!(series.len(), 3);
        let price = store
            .price(&Symbol::new("AAPL"), d(2024, 1, 3), PriceKind::Open)
            .unwrap();
        assert_eq!(price, 200.0);
    }

    #[test]
    fn test_observed_dates_distinct_across_symbols() {
        let mut store = sample_store();
        store.insert_series(
            Symbol::new("MSFT"),
            vec![
                bar(d(2024, 1, 3), Some(300.0), Some(301.0)),
                bar(d(2024, 1, 4), Some(302.0), Some(303.0)),
            ],
        );
        let dates = store.observed_dates();
        assert_eq!(
            dates,
            vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 8)]
        );
    }
}

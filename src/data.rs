//! CSV price ingestion
//!
//! Loads per-symbol daily OHLCV files into the price store. Each file is
//! named `SYMBOL.csv` with a header row; column order follows the header,
//! matched case-insensitively. Numeric cells may carry `$` and thousands
//! separators, and any of them may be blank.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::oracle::PriceStore;
use crate::types::{PriceBar, Symbol};

/// Parse a numeric cell, tolerating `$`, commas, and blanks
fn clean_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(['$', ','], "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Load one symbol's OHLCV series from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<PriceBar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read CSV header row")?
        .clone();
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let date_col = col("date").context("CSV has no date column")?;
    let open_col = col("open");
    let high_col = col("high");
    let low_col = col("low");
    let close_col = col("close");
    let volume_col = col("volume");

    let field = |record: &csv::StringRecord, idx: Option<usize>| {
        idx.and_then(|i| record.get(i)).and_then(clean_number)
    };

    let mut bars = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let date_str = record.get(date_col).unwrap_or_default().trim();
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            invalid_count += 1;
            warn!(
                "Skipping row {} in {:?}: unparseable date {:?}",
                row_idx + 2, // 1-indexed plus header row
                path.file_name().unwrap_or_default(),
                date_str
            );
            continue;
        };

        bars.push(PriceBar {
            date,
            open: field(&record, open_col),
            high: field(&record, high_col),
            low: field(&record, low_col),
            close: field(&record, close_col),
            volume: field(&record, volume_col),
        });
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid rows out of {} in {:?}",
            invalid_count,
            invalid_count + bars.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(bars)
}

/// Load every `SYMBOL.csv` in a directory into the store
///
/// When `symbols` is non-empty, only those files are loaded and each must
/// exist; otherwise every CSV present is taken, symbol taken from the file
/// stem.
pub fn load_dir(
    data_dir: impl AsRef<Path>,
    symbols: &[String],
    store: &mut PriceStore,
) -> Result<usize> {
    let data_dir = data_dir.as_ref();
    let mut loaded = 0;

    if symbols.is_empty() {
        let entries = std::fs::read_dir(data_dir)
            .with_context(|| format!("Failed to read data dir {}", data_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "csv") {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let symbol = Symbol::new(stem);
                let bars = load_csv(&path)?;
                info!(%symbol, bars = bars.len(), "loaded price series");
                store.insert_series(symbol, bars);
                loaded += 1;
            }
        }
    } else {
        for name in symbols {
            let symbol = Symbol::new(name);
            let path = data_dir.join(format!("{}.csv", symbol));
            let bars = load_csv(&path)?;
            info!(%symbol, bars = bars.len(), "loaded price series");
            store.insert_series(symbol, bars);
            loaded += 1;
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_csv_parses_and_cleans_values() {
        let dir = std::env::temp_dir().join("portfolio_sim_data_test_clean");
        std::fs::create_dir_all(&dir).unwrap();
        write_csv(
            &dir,
            "AAPL.csv",
            "Date,Open,High,Low,Close,Volume\n\
             2024-03-01,$100.50,105.00,\"99.25\",\"1,020.75\",2000\n\
             2024-03-04,,106.00,100.00,103.00,\n",
        );

        let bars = load_csv(dir.join("AAPL.csv")).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, Some(100.50));
        assert_eq!(bars[0].close, Some(1020.75));
        assert_eq!(bars[1].open, None);
        assert_eq!(bars[1].volume, None);
    }

    #[test]
    fn test_load_csv_skips_bad_dates() {
        let dir = std::env::temp_dir().join("portfolio_sim_data_test_dates");
        std::fs::create_dir_all(&dir).unwrap();
        write_csv(
            &dir,
            "MSFT.csv",
            "date,open,high,low,close,volume\n\
             not-a-date,1,1,1,1,1\n\
             2024-03-01,300,301,299,300.5,1000\n",
        );

        let bars = load_csv(dir.join("MSFT.csv")).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, Some(300.5));
    }

    #[test]
    fn test_load_dir_discovers_all_csv_files() {
        let dir = std::env::temp_dir().join("portfolio_sim_data_test_dir");
        std::fs::create_dir_all(&dir).unwrap();
        write_csv(
            &dir,
            "TSLA.csv",
            "date,open,high,low,close,volume\n2024-03-01,200,201,199,200.5,1\n",
        );
        write_csv(
            &dir,
            "NFLX.csv",
            "date,open,high,low,close,volume\n2024-03-01,600,601,599,600.5,1\n",
        );

        let mut store = PriceStore::new();
        let loaded = load_dir(&dir, &[], &mut store).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(store.symbol_count(), 2);
    }

    #[test]
    fn test_load_dir_with_explicit_symbols_requires_files() {
        let dir = std::env::temp_dir().join("portfolio_sim_data_test_missing");
        std::fs::create_dir_all(&dir).unwrap();

        let mut store = PriceStore::new();
        let result = load_dir(&dir, &["MISSING".to_string()], &mut store);
        assert!(result.is_err());
    }
}

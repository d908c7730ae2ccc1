//! History command - print a symbol's tracked price series

use anyhow::{Context, Result};

use portfolio_sim::data::load_dir;
use portfolio_sim::oracle::PriceOracle;
use portfolio_sim::{Config, PriceStore, Symbol};

pub fn run(config_path: String, symbol: String) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let mut store = PriceStore::new();
    load_dir(&config.data_dir, &config.symbols, &mut store)
        .with_context(|| format!("Failed to load price data from {}", config.data_dir))?;

    let symbol = Symbol::new(&symbol);
    let series = store.series(&symbol)?;

    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "date", "open", "high", "low", "close", "volume"
    );
    for bar in series.iter().filter(|b| b.open.is_some()) {
        let fmt = |v: Option<f64>| match v {
            Some(v) => format!("{:.2}", v),
            None => "-".to_string(),
        };
        println!(
            "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}",
            bar.date.to_string(),
            fmt(bar.open),
            fmt(bar.high),
            fmt(bar.low),
            fmt(bar.close),
            fmt(bar.volume)
        );
    }
    println!("{} observations", series.iter().filter(|b| b.open.is_some()).count());

    Ok(())
}

//! Replay command
//!
//! Loads price CSVs, submits a scripted trade file through the portfolio
//! service, then runs the simulation clock and reports PnL each tick until
//! the calendar is exhausted (or a tick limit is hit).

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use portfolio_sim::data::load_dir;
use portfolio_sim::{Config, PortfolioService, PriceStore, TradeRequest};

pub fn run(
    config_path: String,
    trades_path: String,
    interval: Option<u64>,
    max_ticks: Option<usize>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path, trades_path, interval, max_ticks))
}

async fn run_async(
    config_path: String,
    trades_path: String,
    interval: Option<u64>,
    max_ticks: Option<usize>,
) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    let interval_secs = interval.unwrap_or(config.interval_secs);

    let mut store = PriceStore::new();
    let loaded = load_dir(&config.data_dir, &config.symbols, &mut store)
        .with_context(|| format!("Failed to load price data from {}", config.data_dir))?;
    info!(symbols = loaded, "price data loaded");

    let contents = std::fs::read_to_string(&trades_path)
        .with_context(|| format!("Failed to read trades file {}", trades_path))?;
    let requests: Vec<TradeRequest> =
        serde_json::from_str(&contents).context("Failed to parse trades JSON")?;

    let service = PortfolioService::new(Arc::new(store), interval_secs);

    for request in &requests {
        match service.submit_trade(request) {
            Ok(execution) => info!(
                "{} {} x{} @ {:.2} committed",
                execution.trade.side,
                execution.trade.symbol,
                execution.trade.quantity,
                execution.trade.price
            ),
            Err(e) => warn!("trade rejected: {}", e),
        }
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(service.clock().run_loop(stop_rx));

    let mut ticks_seen = 0;
    loop {
        sleep(Duration::from_secs(interval_secs.max(1))).await;

        let snap = service.sim_snapshot();
        if let Some(date) = snap.current_date {
            let total_unrealized: f64 = service
                .unrealized_pnl(None)
                .map(|s| s.entries.iter().map(|e| e.unrealized_pnl).sum())
                .unwrap_or(0.0);
            info!(
                %date,
                tick = snap.tick_index,
                of = snap.calendar_len,
                unrealized = format!("{:.2}", total_unrealized),
                "simulation"
            );
        }

        ticks_seen += 1;
        let exhausted = !snap.running;
        let limit_hit = max_ticks.is_some_and(|m| ticks_seen >= m);
        if exhausted || limit_hit {
            break;
        }
    }

    let _ = stop_tx.send(true);
    loop_handle.await.context("clock loop panicked")?;

    print_summary(&service);
    Ok(())
}

fn print_summary(service: &PortfolioService) {
    println!("\n{}", "=".repeat(60));
    println!("PORTFOLIO SUMMARY");
    println!("{}", "=".repeat(60));

    println!("\nOpen positions:");
    let positions = service.positions();
    if positions.is_empty() {
        println!("  (none)");
    }
    for pos in &positions {
        println!(
            "  {:<8} qty {:>6}  avg cost {:>10.2}",
            pos.symbol.as_str(),
            pos.quantity,
            pos.average_cost
        );
    }

    if let Some(snapshot) = service.unrealized_pnl(None) {
        println!("\nUnrealized PnL as of {}:", snapshot.as_of);
        for entry in &snapshot.entries {
            println!(
                "  {:<8} price {:>10.2}  value {:>12.2}  pnl {:>12.2}",
                entry.symbol.as_str(),
                entry.current_price,
                entry.market_value,
                entry.unrealized_pnl
            );
        }
        for (symbol, reason) in &snapshot.omitted {
            println!("  {:<8} omitted: {}", symbol.as_str(), reason);
        }
    }

    let realized = service.realized_trades();
    println!("\nRealized trades (newest first):");
    if realized.is_empty() {
        println!("  (none)");
    }
    for r in &realized {
        println!(
            "  {} {:<8} x{:<5} avg {:>8.2} -> {:>8.2}  pnl {:>10.2}",
            r.date, r.symbol.0, r.quantity, r.avg_buy_price, r.sell_price, r.realized_pnl
        );
    }
    println!();
}

//! Integration tests for the portfolio simulator
//!
//! These tests drive the public service surface end to end: trade
//! submission, accounting, the simulation clock, and the query contracts.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;

use portfolio_sim::{
    PortfolioService, PriceBar, PriceStore, Symbol, TickOutcome, TradeError, TradeRequest,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bar(date: NaiveDate, open: f64, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: Some(open),
        high: Some(open.max(close)),
        low: Some(open.min(close)),
        close: Some(close),
        volume: Some(1000.0),
    }
}

/// AAPL priced on Mar 1, 2, 3, 6 (weekend gap after the 3rd); MSFT priced
/// from Mar 2 onward
fn sample_store() -> PriceStore {
    let mut store = PriceStore::new();
    store.insert_series(
        Symbol::new("AAPL"),
        vec![
            bar(d(2024, 3, 1), 100.0, 100.0),
            bar(d(2024, 3, 2), 200.0, 200.0),
            bar(d(2024, 3, 3), 300.0, 300.0),
            bar(d(2024, 3, 6), 310.0, 312.0),
        ],
    );
    store.insert_series(
        Symbol::new("MSFT"),
        vec![
            bar(d(2024, 3, 2), 50.0, 50.0),
            bar(d(2024, 3, 3), 52.0, 52.0),
            bar(d(2024, 3, 6), 55.0, 55.0),
        ],
    );
    store
}

fn service() -> PortfolioService {
    PortfolioService::new(Arc::new(sample_store()), 2)
}

fn request(symbol: &str, side: &str, quantity: i64, date: &str) -> TradeRequest {
    TradeRequest {
        symbol: symbol.to_string(),
        side: side.to_string(),
        quantity,
        date: date.to_string(),
    }
}

// =============================================================================
// Accounting End to End
// =============================================================================

#[test]
fn test_average_cost_and_realized_pnl_walkthrough() {
    let svc = service();

    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-02"))
        .unwrap();

    let pos = svc.position(&Symbol::new("AAPL"));
    assert_eq!(pos.quantity, 20);
    assert_eq!(pos.average_cost, 150.0);

    let exec = svc
        .submit_trade(&request("AAPL", "SELL", 5, "2024-03-03"))
        .unwrap();
    let realized = exec.realized.unwrap();
    assert_eq!(realized.realized_pnl, 750.0);
    assert_eq!(realized.avg_buy_price, 150.0);

    let pos = svc.position(&Symbol::new("AAPL"));
    assert_eq!(pos.quantity, 15);
    assert_eq!(pos.average_cost, 150.0);
}

#[test]
fn test_oversell_surfaces_owned_quantity_and_commits_nothing() {
    let svc = service();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();

    let err = svc
        .submit_trade(&request("AAPL", "SELL", 25, "2024-03-02"))
        .unwrap_err();
    assert_eq!(
        err,
        TradeError::Oversell {
            symbol: Symbol::new("AAPL"),
            requested: 25,
            owned: 10,
        }
    );

    assert_eq!(svc.trades().len(), 1);
    assert!(svc.realized_trades().is_empty());
}

#[test]
fn test_full_liquidation_then_fresh_buy_starts_clean() {
    let svc = service();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();
    svc.submit_trade(&request("AAPL", "SELL", 10, "2024-03-02"))
        .unwrap();

    assert!(svc.positions().is_empty());

    svc.submit_trade(&request("AAPL", "BUY", 3, "2024-03-03"))
        .unwrap();
    let pos = svc.position(&Symbol::new("AAPL"));
    assert_eq!(pos.quantity, 3);
    assert_eq!(pos.average_cost, 300.0);
}

#[test]
fn test_execution_price_comes_from_oracle_close() {
    let svc = service();
    // Mar 4 has no observation; the close falls back to Mar 3
    let exec = svc
        .submit_trade(&request("AAPL", "BUY", 1, "2024-03-04"))
        .unwrap();
    assert_eq!(exec.trade.price, 300.0);
}

// =============================================================================
// Simulation Clock Through the Service
// =============================================================================

#[test]
fn test_restart_anchors_to_latest_buy_and_replays_forward() {
    let svc = service();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-03"))
        .unwrap();

    let snap = svc.sim_snapshot();
    assert!(snap.running);
    assert_eq!(snap.start_date, Some(d(2024, 3, 3)));
    // Mar 3 and Mar 6 remain at or after the anchor
    assert_eq!(snap.calendar_len, 2);

    let clock = svc.clock();
    assert!(matches!(clock.tick(), TickOutcome::Advanced { .. }));
    let snap = svc.sim_snapshot();
    assert_eq!(snap.current_date, Some(d(2024, 3, 3)));
    assert_eq!(snap.prices.get(&Symbol::new("AAPL")), Some(&300.0));
    assert_eq!(snap.prices.get(&Symbol::new("MSFT")), Some(&52.0));
}

#[test]
fn test_clock_exhausts_then_recovers_on_next_trade() {
    let svc = service();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-03"))
        .unwrap();

    let clock = svc.clock();
    clock.tick();
    clock.tick();
    assert_eq!(clock.tick(), TickOutcome::Exhausted);

    let snap = svc.sim_snapshot();
    assert!(!snap.running);
    assert_eq!(snap.current_date, Some(d(2024, 3, 6)));

    // A new buy re-anchors and restarts the replay
    svc.submit_trade(&request("AAPL", "BUY", 5, "2024-03-06"))
        .unwrap();
    let snap = svc.sim_snapshot();
    assert!(snap.running);
    assert_eq!(snap.start_date, Some(d(2024, 3, 6)));
    assert_eq!(snap.tick_index, 0);
}

#[test]
fn test_unrealized_pnl_follows_the_clock() {
    let svc = service();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();

    let clock = svc.clock();
    clock.tick(); // Mar 1: open 100
    let snap = svc.unrealized_pnl(None).unwrap();
    assert_eq!(snap.entries[0].unrealized_pnl, 0.0);

    clock.tick(); // Mar 2: open 200
    let snap = svc.unrealized_pnl(None).unwrap();
    assert_eq!(snap.entries[0].current_price, 200.0);
    assert_eq!(snap.entries[0].unrealized_pnl, 1000.0);
}

#[test]
fn test_snapshot_omits_symbol_whose_open_lookup_fails() {
    // TSLA's source data never carries an open, so trades execute against
    // its close but every snapshot open lookup fails for it.
    let mut store = sample_store();
    store.insert(
        Symbol::new("TSLA"),
        PriceBar {
            date: d(2024, 3, 1),
            open: None,
            high: None,
            low: None,
            close: Some(180.0),
            volume: None,
        },
    );
    let svc = PortfolioService::new(Arc::new(store), 2);

    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();
    svc.submit_trade(&request("TSLA", "BUY", 5, "2024-03-01"))
        .unwrap();

    let snap = svc.unrealized_pnl(None).unwrap();
    assert_eq!(snap.entries.len(), 1);
    assert_eq!(snap.entries[0].symbol, Symbol::new("AAPL"));
    assert_eq!(snap.omitted.len(), 1);
    assert_eq!(snap.omitted[0].0, Symbol::new("TSLA"));
}

// =============================================================================
// Query Contracts
// =============================================================================

#[test]
fn test_realized_history_newest_first() {
    let svc = service();
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();
    svc.submit_trade(&request("AAPL", "SELL", 2, "2024-03-02"))
        .unwrap();
    svc.submit_trade(&request("AAPL", "SELL", 3, "2024-03-03"))
        .unwrap();

    let history = svc.realized_trades();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, d(2024, 3, 3));
    assert_eq!(history[0].quantity, 3);
    assert_eq!(history[1].date, d(2024, 3, 2));
}

#[test]
fn test_price_history_passthrough_ascending() {
    let svc = service();
    let history = svc.price_history(&Symbol::new("MSFT")).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn test_idle_simulation_reports_absent_dates() {
    let svc = service();
    let snap = svc.sim_snapshot();
    assert!(!snap.running);
    assert_eq!(snap.start_date, None);
    assert_eq!(snap.current_date, None);
    assert!(snap.prices.is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_readers_see_consistent_snapshots() {
    let svc = Arc::new(service());
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();

    let clock = svc.clock();
    let writer = {
        let clock = clock.clone();
        std::thread::spawn(move || {
            for _ in 0..4 {
                clock.tick();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let snap = svc.sim_snapshot();
                    // After at least one tick, the current date must be the
                    // calendar entry just behind the tick index.
                    if snap.tick_index > 0 {
                        assert!(snap.current_date.is_some());
                        assert!(snap.current_date >= snap.start_date);
                    }
                    assert!(snap.tick_index <= snap.calendar_len);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

#[tokio::test]
async fn test_background_loop_drives_replay_to_exhaustion() {
    let store = sample_store();
    let svc = PortfolioService::new(Arc::new(store), 0);
    svc.submit_trade(&request("AAPL", "BUY", 10, "2024-03-01"))
        .unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(svc.clock().run_loop(stop_rx));

    for _ in 0..200 {
        if !svc.sim_snapshot().running {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let snap = svc.sim_snapshot();
    assert!(!snap.running, "loop should exhaust the 4-day calendar");
    assert_eq!(snap.current_date, Some(d(2024, 3, 6)));
    assert_eq!(snap.tick_index, 4);

    stop_tx.send(true).unwrap();
    handle.await.unwrap();
}

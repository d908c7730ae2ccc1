//! Position and PnL accounting engine
//!
//! Rolling weighted-average-cost model: the cost basis of an open position
//! is the quantity-weighted mean purchase price of all unsold shares, and a
//! sell never changes the average cost of the remaining shares. Positions
//! are pure functions of the ledger, recomputed on demand.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PriceError, TradeError};
use crate::ledger::{LedgerReader, TradeLedger};
use crate::oracle::PriceOracle;
use crate::types::{round2, Position, PriceKind, RealizedTrade, Side, Symbol, Trade};

/// Result of a committed trade submission
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub trade: Trade,
    /// Present exactly when the trade was a SELL
    pub realized: Option<RealizedTrade>,
}

/// One symbol's entry in an unrealized PnL snapshot
///
/// Monetary fields are rounded to 2 decimals at this boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrealizedEntry {
    pub symbol: Symbol,
    pub quantity: i64,
    pub average_cost: f64,
    pub current_price: f64,
    pub cost_basis: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

/// Unrealized PnL across all open positions at one as-of date
///
/// A symbol whose price lookup failed is listed in `omitted` instead of
/// `entries`; omission is an expected outcome near the start of a series,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrealizedSnapshot {
    pub as_of: NaiveDate,
    pub entries: Vec<UnrealizedEntry>,
    pub omitted: Vec<(Symbol, PriceError)>,
}

/// Accounting engine over an injected ledger and price oracle
///
/// `execute` is the only code path that appends to the ledger, and the
/// submission mutex serializes its read-validate-append sequence, so a sell
/// can never be validated against a ledger another submission is mutating.
pub struct AccountingEngine {
    ledger: Arc<TradeLedger>,
    oracle: Arc<dyn PriceOracle>,
    submission: Mutex<()>,
}

impl AccountingEngine {
    pub fn new(ledger: Arc<TradeLedger>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            ledger,
            oracle,
            submission: Mutex::new(()),
        }
    }

    /// Current net position for one symbol
    pub fn position(&self, symbol: &Symbol) -> Position {
        walk_average_cost(symbol, &self.ledger.trades_for(symbol))
    }

    /// All open (nonzero) positions, sorted by symbol
    pub fn positions(&self) -> Vec<Position> {
        let mut symbols: Vec<Symbol> = self
            .ledger
            .trades()
            .into_iter()
            .map(|t| t.symbol)
            .collect();
        symbols.sort();
        symbols.dedup();

        symbols
            .into_iter()
            .map(|s| self.position(&s))
            .filter(Position::is_open)
            .collect()
    }

    /// Reject a sell larger than the currently owned quantity
    ///
    /// Returns the pre-sell position on success so the caller can reuse the
    /// average cost it was validated against.
    pub fn validate_sell(&self, symbol: &Symbol, requested: u32) -> Result<Position, TradeError> {
        let position = self.position(symbol);
        if i64::from(requested) > position.quantity {
            return Err(TradeError::Oversell {
                symbol: symbol.clone(),
                requested,
                owned: position.quantity,
            });
        }
        Ok(position)
    }

    /// Execute a validated trade request: derive the execution price from
    /// the oracle, reject oversells, append, and emit the realized-trade
    /// record for sells
    ///
    /// The average cost is computed once, before the append, and used for
    /// both the oversell check and the realized PnL.
    pub fn execute(
        &self,
        symbol: Symbol,
        side: Side,
        quantity: u32,
        date: NaiveDate,
    ) -> Result<Execution, TradeError> {
        let _guard = self.submission.lock().unwrap_or_else(|e| e.into_inner());

        // A trade cannot execute without a known price: hard rejection here,
        // unlike the per-symbol omission in snapshots.
        let price = self.oracle.price(&symbol, date, PriceKind::Close)?;

        match side {
            Side::Buy => {
                let trade = self.ledger.append_buy(symbol.clone(), quantity, price, date);
                info!(%symbol, quantity, price, %date, "buy executed");
                Ok(Execution {
                    trade,
                    realized: None,
                })
            }
            Side::Sell => {
                let position = self.validate_sell(&symbol, quantity)?;
                let realized = RealizedTrade {
                    symbol: symbol.clone(),
                    quantity,
                    avg_buy_price: round2(position.average_cost),
                    sell_price: round2(price),
                    realized_pnl: round2((price - position.average_cost) * f64::from(quantity)),
                    date,
                };
                let trade =
                    self.ledger
                        .append_sell(symbol.clone(), quantity, price, date, realized.clone());
                info!(
                    %symbol,
                    quantity,
                    price,
                    %date,
                    pnl = realized.realized_pnl,
                    "sell executed"
                );
                Ok(Execution {
                    trade,
                    realized: Some(realized),
                })
            }
        }
    }

    /// Unrealized PnL for every open position, priced at `as_of`
    pub fn unrealized_snapshot(&self, as_of: NaiveDate) -> UnrealizedSnapshot {
        let mut entries = Vec::new();
        let mut omitted = Vec::new();

        for position in self.positions() {
            match self.oracle.price(&position.symbol, as_of, PriceKind::Open) {
                Ok(current_price) => {
                    let qty = position.quantity as f64;
                    let cost_basis = position.average_cost * qty;
                    let market_value = current_price * qty;
                    entries.push(UnrealizedEntry {
                        symbol: position.symbol,
                        quantity: position.quantity,
                        average_cost: round2(position.average_cost),
                        current_price: round2(current_price),
                        cost_basis: round2(cost_basis),
                        market_value: round2(market_value),
                        unrealized_pnl: round2(market_value - cost_basis),
                    });
                }
                Err(e) => {
                    debug!(symbol = %position.symbol, %as_of, error = %e, "omitting symbol from snapshot");
                    omitted.push((position.symbol, e));
                }
            }
        }

        UnrealizedSnapshot {
            as_of,
            entries,
            omitted,
        }
    }
}

/// Walk one symbol's trades in accounting order, tracking net quantity and
/// the average cost of the open lot
///
/// The sell quantity is clamped to the owned quantity as a safety net only;
/// oversells are rejected atomically in `execute` before anything reaches
/// the ledger.
fn walk_average_cost(symbol: &Symbol, trades: &[Trade]) -> Position {
    let mut qty: i64 = 0;
    let mut avg_cost = 0.0;

    for trade in trades {
        let q = i64::from(trade.quantity);
        match trade.side {
            Side::Buy => {
                let new_qty = qty + q;
                if new_qty > 0 {
                    avg_cost = (avg_cost * qty as f64 + trade.price * q as f64) / new_qty as f64;
                }
                qty = new_qty;
            }
            Side::Sell => {
                let sell_qty = q.min(qty);
                qty -= sell_qty;
                if qty == 0 {
                    avg_cost = 0.0;
                }
            }
        }
    }

    Position {
        symbol: symbol.clone(),
        quantity: qty,
        average_cost: avg_cost,
    }
}

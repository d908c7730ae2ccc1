//! Portfolio service facade
//!
//! The surface a routing layer calls into: trade submission plus the query
//! contracts (positions, realized and unrealized PnL, price history, and
//! the simulation snapshot). Wires the ledger, accounting engine, and
//! simulation clock together over one injected price oracle.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::accounting::{AccountingEngine, Execution, UnrealizedSnapshot};
use crate::clock::{SimClock, SimSnapshot};
use crate::error::{PriceError, TradeError};
use crate::ledger::{LedgerReader, TradeLedger};
use crate::oracle::PriceOracle;
use crate::types::{Position, PriceBar, RealizedTrade, Side, Symbol, Trade};

/// Raw trade submission as a routing layer would deliver it
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub side: String,
    pub quantity: i64,
    /// Calendar date, YYYY-MM-DD
    pub date: String,
}

impl TradeRequest {
    /// Field-level validation; no state is touched until this passes
    fn parse(&self) -> Result<(Symbol, Side, u32, NaiveDate), TradeError> {
        if self.symbol.trim().is_empty() {
            return Err(TradeError::EmptySymbol);
        }
        let symbol = Symbol::new(&self.symbol);

        let side =
            Side::from_str(&self.side).map_err(|_| TradeError::InvalidSide(self.side.clone()))?;

        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(TradeError::NonPositiveQuantity(self.quantity))?;

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| TradeError::InvalidDate(self.date.clone()))?;

        Ok((symbol, side, quantity, date))
    }
}

/// Single-portfolio trading service
pub struct PortfolioService {
    ledger: Arc<TradeLedger>,
    engine: AccountingEngine,
    clock: Arc<SimClock>,
    oracle: Arc<dyn PriceOracle>,
    interval_secs: u64,
}

impl PortfolioService {
    pub fn new(oracle: Arc<dyn PriceOracle>, interval_secs: u64) -> Self {
        let ledger = Arc::new(TradeLedger::new());
        let clock = Arc::new(SimClock::new(
            ledger.clone() as Arc<dyn LedgerReader>,
            oracle.clone(),
        ));
        let engine = AccountingEngine::new(ledger.clone(), oracle.clone());
        Self {
            ledger,
            engine,
            clock,
            oracle,
            interval_secs,
        }
    }

    /// The clock, for spawning its background loop at startup
    pub fn clock(&self) -> Arc<SimClock> {
        self.clock.clone()
    }

    /// Validate, execute, and commit a trade, then re-anchor the simulation
    ///
    /// The restart runs strictly after the append so it always observes the
    /// trade that triggered it.
    pub fn submit_trade(&self, request: &TradeRequest) -> Result<Execution, TradeError> {
        let (symbol, side, quantity, date) = request.parse()?;
        let execution = self.engine.execute(symbol, side, quantity, date)?;
        self.clock.restart(self.interval_secs);
        Ok(execution)
    }

    /// Net position for one symbol
    pub fn position(&self, symbol: &Symbol) -> Position {
        self.engine.position(symbol)
    }

    /// All open positions, sorted by symbol
    pub fn positions(&self) -> Vec<Position> {
        self.engine.positions()
    }

    /// Unrealized PnL at the simulation's current date, or `fallback` when
    /// no simulation has started; `None` when neither date exists
    pub fn unrealized_pnl(&self, fallback: Option<NaiveDate>) -> Option<UnrealizedSnapshot> {
        let as_of = self.clock.current_date().or(fallback)?;
        Some(self.engine.unrealized_snapshot(as_of))
    }

    /// Realized-trade history, newest first
    pub fn realized_trades(&self) -> Vec<RealizedTrade> {
        self.ledger.realized_trades()
    }

    /// Full trade history in accounting order
    pub fn trades(&self) -> Vec<Trade> {
        self.ledger.trades()
    }

    /// A symbol's price series, ascending, omitting observations with no
    /// open value
    pub fn price_history(&self, symbol: &Symbol) -> Result<Vec<PriceBar>, PriceError> {
        Ok(self
            .oracle
            .series(symbol)?
            .into_iter()
            .filter(|b| b.open.is_some())
            .collect())
    }

    /// Current simulation state
    pub fn sim_snapshot(&self) -> SimSnapshot {
        self.clock.snapshot()
    }
}

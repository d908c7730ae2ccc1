//! Append-only trade ledger
//!
//! The ledger is the single source of truth for positions. Trades are never
//! mutated or deleted; realized trades are recorded in the same append as
//! the SELL that produced them so readers never see one without the other.

use std::sync::RwLock;

use chrono::NaiveDate;

use crate::types::{RealizedTrade, Side, Symbol, Trade, TradeId};

/// Read access to the trade history, injectable into the clock and the
/// accounting engine
pub trait LedgerReader: Send + Sync {
    /// Full trade history in accounting order (date ascending, then
    /// append order)
    fn trades(&self) -> Vec<Trade>;

    /// One symbol's trades in accounting order
    fn trades_for(&self, symbol: &Symbol) -> Vec<Trade>;

    /// Date of the most recent BUY anywhere in the ledger
    fn latest_buy_date(&self) -> Option<NaiveDate>;
}

#[derive(Debug, Default)]
struct LedgerInner {
    trades: Vec<Trade>,
    realized: Vec<RealizedTrade>,
    next_id: TradeId,
}

/// In-memory append-only ledger
#[derive(Debug, Default)]
pub struct TradeLedger {
    inner: RwLock<LedgerInner>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a BUY
    pub fn append_buy(&self, symbol: Symbol, quantity: u32, price: f64, date: NaiveDate) -> Trade {
        self.append(symbol, Side::Buy, quantity, price, date, None)
    }

    /// Append a SELL together with its realized-trade record
    pub fn append_sell(
        &self,
        symbol: Symbol,
        quantity: u32,
        price: f64,
        date: NaiveDate,
        realized: RealizedTrade,
    ) -> Trade {
        self.append(symbol, Side::Sell, quantity, price, date, Some(realized))
    }

    fn append(
        &self,
        symbol: Symbol,
        side: Side,
        quantity: u32,
        price: f64,
        date: NaiveDate,
        realized: Option<RealizedTrade>,
    ) -> Trade {
        let mut inner = self.write();
        inner.next_id += 1;
        let trade = Trade {
            id: inner.next_id,
            symbol,
            side,
            quantity,
            price,
            date,
        };
        inner.trades.push(trade.clone());
        if let Some(r) = realized {
            inner.realized.push(r);
        }
        trade
    }

    /// Realized-trade history, newest first
    pub fn realized_trades(&self) -> Vec<RealizedTrade> {
        let inner = self.read();
        inner.realized.iter().rev().cloned().collect()
    }

    pub fn trade_count(&self) -> usize {
        self.read().trades.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LedgerInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl LedgerReader for TradeLedger {
    fn trades(&self) -> Vec<Trade> {
        let mut trades = self.read().trades.clone();
        // ids are monotonically increasing, so same-day trades keep their
        // append order
        trades.sort_by_key(|t| (t.date, t.id));
        trades
    }

    fn trades_for(&self, symbol: &Symbol) -> Vec<Trade> {
        let mut trades: Vec<Trade> = self
            .read()
            .trades
            .iter()
            .filter(|t| &t.symbol == symbol)
            .cloned()
            .collect();
        trades.sort_by_key(|t| (t.date, t.id));
        trades
    }

    fn latest_buy_date(&self) -> Option<NaiveDate> {
        self.read()
            .trades
            .iter()
            .filter(|t| t.side == Side::Buy)
            .map(|t| t.date)
            .max()
    }
}

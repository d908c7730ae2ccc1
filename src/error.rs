//! Error taxonomy for price lookups and trade submission
//!
//! Two tiers, per the propagation policy:
//! - [`PriceError`]: a lookup failed for one symbol. Hard rejection during
//!   trade execution, silent per-symbol omission during snapshots and ticks.
//! - [`TradeError`]: validation failures and domain rejections returned
//!   synchronously to the submitter; no state is mutated on any of them.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::Symbol;

/// Price oracle lookup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(Symbol),

    #[error("no price data for {symbol} on or before {date}")]
    NoPriceOnOrBefore { symbol: Symbol, date: NaiveDate },
}

/// Trade submission failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("invalid side: {0}. Use BUY or SELL")]
    InvalidSide(String),

    #[error("quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i64),

    #[error("invalid date: {0}. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("cannot sell {requested} {symbol}: only {owned} owned")]
    Oversell {
        symbol: Symbol,
        requested: u32,
        owned: i64,
    },

    #[error(transparent)]
    Price(#[from] PriceError),
}

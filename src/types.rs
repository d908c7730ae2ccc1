//! Core data types used across the portfolio simulator

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ticker symbol, normalized to uppercase on construction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(s.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("Unknown side: {}. Use BUY or SELL", other)),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Which field of a daily observation a price lookup wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceKind {
    Open,
    High,
    Low,
    Close,
}

/// One daily OHLCV observation
///
/// Source data is allowed to carry gaps, so every field except the date is
/// optional. Lookups skip observations that lack the requested field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceBar {
    /// The value of the requested price field, if present
    pub fn field(&self, kind: PriceKind) -> Option<f64> {
        match kind {
            PriceKind::Open => self.open,
            PriceKind::High => self.high,
            PriceKind::Low => self.low,
            PriceKind::Close => self.close,
        }
    }
}

/// Ledger-assigned id; breaks ordering ties between same-day trades
pub type TradeId = u64;

/// Immutable trade ledger entry
///
/// Created only by trade submission, never mutated or deleted. Accounting
/// order is (date ascending, then id ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u32,
    pub price: f64,
    pub date: NaiveDate,
}

/// Immutable record emitted exactly once per executed SELL
///
/// Captures the average buy cost at the moment of sale, which cannot be
/// recovered by replaying the ledger after further trades. All monetary
/// fields are rounded to 2 decimals at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedTrade {
    pub symbol: Symbol,
    pub quantity: u32,
    pub avg_buy_price: f64,
    pub sell_price: f64,
    pub realized_pnl: f64,
    pub date: NaiveDate,
}

/// Net open position for one symbol, derived from the ledger on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed sum of trade quantities (BUY positive, SELL negative)
    pub quantity: i64,
    /// Rolling weighted-average cost of the open lot; 0.0 when flat
    pub average_cost: f64,
}

impl Position {
    pub fn flat(symbol: Symbol) -> Self {
        Position {
            symbol,
            quantity: 0,
            average_cost: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity != 0
    }
}

/// Round a monetary amount to 2 decimal places
///
/// Applied at record creation and query boundaries only; intermediate
/// accumulation keeps full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

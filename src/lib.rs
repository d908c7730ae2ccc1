//! Portfolio Simulator
//!
//! A single-portfolio paper trading system built from an immutable ledger of
//! BUY/SELL trades. Positions and profit are derived with average-cost
//! accounting, and a background simulation clock replays historical daily
//! prices starting from the most recent BUY, so unrealized PnL moves as the
//! replay advances.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use portfolio_sim::{PortfolioService, PriceStore, TradeRequest};
//!
//! let mut store = PriceStore::new();
//! // ... fill the store, e.g. via portfolio_sim::data::load_dir ...
//! let service = PortfolioService::new(Arc::new(store), 2);
//!
//! let request = TradeRequest {
//!     symbol: "AAPL".to_string(),
//!     side: "BUY".to_string(),
//!     quantity: 10,
//!     date: "2024-03-01".to_string(),
//! };
//! let execution = service.submit_trade(&request)?;
//! println!("bought at {}", execution.trade.price);
//! # Ok::<(), portfolio_sim::TradeError>(())
//! ```

pub mod accounting;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod service;
pub mod types;

pub use accounting::{AccountingEngine, Execution, UnrealizedEntry, UnrealizedSnapshot};
pub use clock::{SimClock, SimSnapshot, TickOutcome, TickQuote};
pub use config::Config;
pub use error::{PriceError, TradeError};
pub use ledger::{LedgerReader, TradeLedger};
pub use oracle::{PriceOracle, PriceStore};
pub use service::{PortfolioService, TradeRequest};
pub use types::*;

//! Simulation clock
//!
//! A background state machine that replays the trading calendar one day per
//! interval, anchored at the date of the most recent BUY in the ledger. Its
//! current date is "today" for every downstream PnL calculation.
//!
//! Three logical states:
//! - Idle: no BUY exists, no calendar, not running
//! - Running: calendar non-empty, advancing on the interval
//! - Exhausted: ran past the end of the calendar; current date frozen until
//!   the next restart
//!
//! One mutex guards the whole state. `restart` and `tick` both take it, so
//! they can never interleave, and `snapshot` hands out a consistent copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::calendar::build_calendar;
use crate::error::PriceError;
use crate::ledger::LedgerReader;
use crate::oracle::PriceOracle;
use crate::types::{PriceKind, Symbol};

/// Re-check period while the clock is not running
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct SimState {
    running: bool,
    interval: Duration,
    calendar: Vec<NaiveDate>,
    idx: usize,
    start_date: Option<NaiveDate>,
    current_date: Option<NaiveDate>,
    prices: HashMap<Symbol, f64>,
}

/// Consistent copy of the clock's state for queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimSnapshot {
    pub running: bool,
    pub interval_secs: u64,
    pub start_date: Option<NaiveDate>,
    pub current_date: Option<NaiveDate>,
    pub tick_index: usize,
    pub calendar_len: usize,
    /// Last tick's per-symbol open prices
    pub prices: HashMap<Symbol, f64>,
}

/// Per-symbol outcome of one tick's price refresh
#[derive(Debug, Clone, PartialEq)]
pub enum TickQuote {
    Quoted(f64),
    /// Lookup failed; the symbol is left out of this tick's price map
    Omitted(PriceError),
}

/// Result of one clock advance
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not running or no calendar; nothing changed
    Skipped,
    /// Ran past the end of the calendar; the clock stopped and the current
    /// date stays frozen
    Exhausted,
    /// Advanced to `date` with the given per-symbol quote outcomes
    Advanced {
        date: NaiveDate,
        quotes: Vec<(Symbol, TickQuote)>,
    },
}

/// The simulation clock; the only owner of mutable simulation state
pub struct SimClock {
    state: Mutex<SimState>,
    ledger: Arc<dyn LedgerReader>,
    oracle: Arc<dyn PriceOracle>,
}

impl SimClock {
    pub fn new(ledger: Arc<dyn LedgerReader>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            ledger,
            oracle,
        }
    }

    /// Rebuild the calendar anchored at the most recent BUY and reset the
    /// tick index
    ///
    /// Returns `false` when no BUY exists anywhere in the ledger: the clock
    /// goes Idle with everything cleared. Idempotent for an unchanged
    /// ledger.
    pub fn restart(&self, interval_secs: u64) -> bool {
        let anchor = self.ledger.latest_buy_date();
        let mut st = self.lock();
        st.interval = Duration::from_secs(interval_secs);

        let Some(start) = anchor else {
            st.running = false;
            st.calendar.clear();
            st.idx = 0;
            st.start_date = None;
            st.current_date = None;
            st.prices.clear();
            info!("no BUY trade in ledger; simulation idle");
            return false;
        };

        let calendar = build_calendar(self.oracle.as_ref(), start);
        st.current_date = Some(calendar.first().copied().unwrap_or(start));
        st.calendar = calendar;
        st.idx = 0;
        st.start_date = Some(start);
        st.prices.clear();
        st.running = true;
        info!(
            start = %start,
            days = st.calendar.len(),
            interval_secs,
            "simulation restarted"
        );
        true
    }

    /// Advance one calendar day and refresh every tracked symbol's open
    /// price as of that day
    ///
    /// Per-symbol lookup failures are contained: the symbol is omitted from
    /// the price map and the tick completes for the rest.
    pub fn tick(&self) -> TickOutcome {
        let mut st = self.lock();
        if !st.running || st.calendar.is_empty() {
            return TickOutcome::Skipped;
        }
        if st.idx >= st.calendar.len() {
            st.running = false;
            info!(current = ?st.current_date, "calendar exhausted; simulation stopped");
            return TickOutcome::Exhausted;
        }

        let date = st.calendar[st.idx];
        st.current_date = Some(date);

        let mut prices = HashMap::new();
        let mut quotes = Vec::new();
        for symbol in self.oracle.symbols() {
            match self.oracle.price(&symbol, date, PriceKind::Open) {
                Ok(price) => {
                    prices.insert(symbol.clone(), price);
                    quotes.push((symbol, TickQuote::Quoted(price)));
                }
                Err(e) => {
                    debug!(%symbol, %date, error = %e, "no price this tick");
                    quotes.push((symbol, TickQuote::Omitted(e)));
                }
            }
        }
        st.prices = prices;
        st.idx += 1;

        TickOutcome::Advanced { date, quotes }
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> SimSnapshot {
        let st = self.lock();
        SimSnapshot {
            running: st.running,
            interval_secs: st.interval.as_secs(),
            start_date: st.start_date,
            current_date: st.current_date,
            tick_index: st.idx,
            calendar_len: st.calendar.len(),
            prices: st.prices.clone(),
        }
    }

    /// The simulated "today", if a simulation has ever started
    pub fn current_date(&self) -> Option<NaiveDate> {
        self.lock().current_date
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drive the clock until `stop` fires
    ///
    /// While running, ticks then sleeps the configured interval; while idle
    /// or exhausted, re-checks every [`IDLE_POLL`]. Tick failures never
    /// escape the loop.
    pub async fn run_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        info!("simulation clock loop started");
        loop {
            let running = {
                let st = self.lock();
                st.running
            };

            let pause = if running {
                match self.tick() {
                    TickOutcome::Advanced { date, ref quotes } => {
                        let quoted = quotes
                            .iter()
                            .filter(|(_, q)| matches!(q, TickQuote::Quoted(_)))
                            .count();
                        debug!(%date, quoted, total = quotes.len(), "tick");
                    }
                    TickOutcome::Exhausted | TickOutcome::Skipped => {}
                }
                let st = self.lock();
                if st.running {
                    st.interval
                } else {
                    IDLE_POLL
                }
            } else {
                IDLE_POLL
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!("simulation clock loop stopping");
                        break;
                    }
                }
            }
        }
    }
}

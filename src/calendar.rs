//! Trading calendar derivation
//!
//! The simulation's tick domain is the union of all dates with price data at
//! or after a start date. No synthetic dates are generated, so gaps and
//! holidays in the underlying series carry through to the calendar.

use chrono::NaiveDate;
use itertools::Itertools;

use crate::oracle::PriceOracle;

/// All distinct observation dates >= `start`, ascending
pub fn build_calendar(oracle: &dyn PriceOracle, start: NaiveDate) -> Vec<NaiveDate> {
    oracle
        .observed_dates()
        .into_iter()
        .filter(|d| *d >= start)
        .sorted()
        .dedup()
        .collect()
}

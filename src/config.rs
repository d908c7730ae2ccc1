//! Configuration management
//!
//! JSON file configuration with defaults, kept to what the simulator
//! actually needs: where price CSVs live, which symbols to track, and how
//! fast the clock ticks.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default clock interval between simulated trading days
pub const DEFAULT_INTERVAL_SECS: u64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding per-symbol `SYMBOL.csv` price files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Seconds between simulation ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Symbols to track; empty means every CSV found in `data_dir`
    #[serde(default)]
    pub symbols: Vec<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            interval_secs: default_interval_secs(),
            symbols: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }
}

//! Portfolio simulator - main entry point
//!
//! This binary provides two subcommands:
//! - replay: replay a scripted trade file against historical prices and
//!   watch the simulation clock advance
//! - history: print a symbol's tracked price series

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "portfolio-sim")]
#[command(about = "Single-portfolio paper trading simulator with historical price replay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trades file through the simulator
    Replay {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/portfolio.json")]
        config: String,

        /// Path to a JSON array of trade requests
        #[arg(short, long, default_value = "trades.json")]
        trades: String,

        /// Seconds between simulation ticks (overrides config)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many observed ticks instead of running to
        /// calendar exhaustion
        #[arg(long)]
        ticks: Option<usize>,
    },

    /// Print the tracked price series for a symbol
    History {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/portfolio.json")]
        config: String,

        /// Symbol to print
        symbol: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Replay { .. } => "replay",
        Commands::History { .. } => "history",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Replay {
            config,
            trades,
            interval,
            ticks,
        } => commands::replay::run(config, trades, interval, ticks),

        Commands::History { config, symbol } => commands::history::run(config, symbol),
    }
}

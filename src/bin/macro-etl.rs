//! Macro data ETL binary
//!
//! Run with: `cargo run --bin macro-etl -- fetch --initial`

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use macro_data::loader::write_csv_tables;
use macro_data::{
    build_views, config, logging, run_etl, run_forecasts, EtlConfig, HttpClient, LoadMode, RunContext, Sources, SqliteStore,
    MODELS,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(name = "macro-etl", version, about = "ETL script for macro data.")]
struct Cli {
    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// SQLite database path
    #[arg(long, global = true, env = "DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch every dataset and load it into the database
    Fetch {
        /// Run full load and recreate tables
        #[arg(long)]
        initial: bool,
        /// Also mirror every fetched table to CSV and data_debug.xlsx under <DATA_DIR>/debug
        #[arg(long)]
        debug: bool,
    },
    /// Fit the ISM models and replace their prediction tables
    Predict,
    /// Export the liquidity and credit views as CSV
    Views {
        /// Output directory (default: <DATA_DIR>/views)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_file = config::load_env_file();
    let mut config = EtlConfig::from_env();
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let verbose = matches!(cli.command, Command::Fetch { debug: true, .. });
    logging::init_logging(&config.log_file, verbose)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialise logging")?;
    match env_file {
        Ok(Some(path)) => debug!("Environment loaded from {}", path.display()),
        Ok(None) => debug!("No .env file found, using the process environment"),
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    let today = cli.today.unwrap_or_else(|| Utc::now().date_naive());
    let mut store = SqliteStore::new(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    match cli.command {
        Command::Fetch { initial, debug } => {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            let http = HttpClient::with_config(config.http.clone())?;
            let sources = Sources::new(http, config.fred_api_key.clone());
            let ctx = RunContext {
                today,
                mode: if initial { LoadMode::Full } else { LoadMode::Incremental },
                debug,
                data_dir: config.data_dir.clone(),
            };
            info!("Starting {} run for {}", if initial { "full" } else { "incremental" }, ctx.today);
            let report = runtime.block_on(run_etl(&sources, &ctx, &mut store))?;
            for (name, reason) in &report.failed {
                eprintln!("  failed: {} ({})", name, reason);
            }
        }
        Command::Predict => {
            let reports = run_forecasts(&mut store, &MODELS)?;
            let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
            info!("Forecast run finished: {} of {} models fitted.", reports.len() - failed, reports.len());
        }
        Command::Views { out } => {
            let dir = out.unwrap_or_else(|| config.data_dir.join("views"));
            let views = build_views(&store)?;
            write_csv_tables(&dir, &views)?;
            info!("Wrote {} views to {}", views.len(), dir.display());
        }
    }
    Ok(())
}


//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `geotag` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use geotag::initialization::init_logger_with;
use geotag::{run_enrichment, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists). This allows
    // setting MAXMIND_LICENSE_KEY or GEOIP_GRANULARITY without exporting
    // them manually. Try the current directory first, then the executable's
    // directory.
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_enrichment(config).await {
        Ok(report) => {
            println!(
                "Enriched {} connection{} ({} fallback{}) at granularity {} in {:.1}s [db {}]",
                report.total_connections,
                if report.total_connections == 1 { "" } else { "s" },
                report.fallbacks,
                if report.fallbacks == 1 { "" } else { "s" },
                report.granularity,
                report.elapsed_seconds,
                report.database_version
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("geotag error: {:#}", e);
            process::exit(1);
        }
    }
}

//! Shared utilities for CLI commands

use crate::config;
use crate::source::ScriptSource;
use anyhow::Result;
use chrono::{TimeZone, Utc};
use owo_colors::OwoColorize;
use std::sync::Arc;
use stratum_core::{Error, Migrator};
use stratum_store::SledStore;

/// Load config, open the embedded store, and snapshot the script catalog.
pub fn open_migrator() -> Result<Migrator> {
    let loaded = config::load()?;
    let store = Arc::new(SledStore::open(&loaded.store_path())?);
    let source = ScriptSource::new(loaded.migrations_dir());
    Ok(Migrator::new(store, loaded.run_config(), &source)?)
}

/// Format a ledger timestamp (unix ms) for display.
pub fn format_run_date(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{ms}ms"),
    }
}

/// Print an error the way the process exit code alone can't: the
/// out-of-sync diagnostic gets its expected-vs-actual listing, everything
/// else gets the full cause chain.
pub fn print_error(err: &anyhow::Error) {
    if let Some(Error::OutOfSync { expected, actual }) = err.downcast_ref::<Error>() {
        eprintln!(
            "{}",
            "Ledger is out of sync with the migration catalog".red().bold()
        );
        eprintln!();
        eprintln!("{}", "Expected (ledger order):".bold());
        for file in expected {
            eprintln!("  {}", file.yellow());
        }
        eprintln!("{}", "Actual (catalog):".bold());
        for file in actual {
            eprintln!("  {}", file.cyan());
        }
        eprintln!();
        eprintln!(
            "{}",
            "Fix the catalog by hand, or run 'stratum nuclear' to revert from ledger contents."
                .dimmed()
        );
        return;
    }

    eprintln!("{} {:#}", "error:".red().bold(), err);
}

//! Create a stratum.toml and the migrations directory

use crate::config::CONFIG_FILE;
use anyhow::{bail, Result};
use owo_colors::OwoColorize;
use std::env;

const CONFIG_TEMPLATE: &str = r#"# Stratum configuration

# Directory of migration scripts (relative to this file)
migrations_dir = "migrations"

# Ledger table recording applied migrations
ledger_table = "stratum_ledger"

# Embedded store location
store_path = ".stratum/store"

# Recorded as run_by on ledger records; defaults to $USER
# actor = "deploy-bot"

# Store raw script bytes on ledger records (required for nuclear mode)
store_contents = true
"#;

pub async fn run() -> Result<()> {
    let current_dir = env::current_dir()?;
    let config_path = current_dir.join(CONFIG_FILE);

    if config_path.exists() {
        bail!("{} already exists in {}", CONFIG_FILE, current_dir.display());
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)?;
    std::fs::create_dir_all(current_dir.join("migrations"))?;

    println!(
        "{} stratum project at {}",
        "Initialized".green().bold(),
        current_dir.display()
    );
    println!();
    println!("Created:");
    println!("  - {CONFIG_FILE}       (configuration)");
    println!("  - migrations/       (migration scripts)");
    println!();
    println!("Next steps:");
    println!("  - Run 'stratum create <name>' to scaffold a migration");
    println!("  - Run 'stratum up' to apply pending migrations");
    Ok(())
}

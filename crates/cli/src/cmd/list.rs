//! Show which migrations have run

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    let migrator = util::open_migrator()?;
    let rows = migrator.status().await?;

    if rows.is_empty() {
        println!("{}", "No migrations. Create some.".yellow());
        return Ok(());
    }

    for row in rows {
        match row.record {
            Some(record) => println!(
                "{} migrated on {} by {}",
                row.file.bold(),
                util::format_run_date(record.run_date).cyan(),
                record.run_by.cyan()
            ),
            None => println!(
                "{} {}",
                row.file.bold(),
                "has not been migrated".yellow()
            ),
        }
    }
    Ok(())
}

//! Revert recorded migrations, newest first

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(target: Option<&str>) -> Result<()> {
    let migrator = util::open_migrator()?;
    let summary = migrator.down(target).await?;

    if summary.executed == 0 {
        println!("{}", "...No work...".bold());
        println!("{}", "Nothing to migrate down".cyan());
    } else {
        println!(
            "{} {} migration{} reverted",
            "down complete:".green().bold(),
            summary.executed,
            if summary.executed == 1 { "" } else { "s" }
        );
        if summary.torn_down {
            println!(
                "{}",
                "No remaining migrations - ledger table removed".dimmed()
            );
        }
    }
    Ok(())
}

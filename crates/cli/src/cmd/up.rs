//! Apply pending migrations

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

pub async fn run(target: Option<&str>) -> Result<()> {
    let migrator = util::open_migrator()?;
    let summary = migrator.up(target).await?;

    if summary.executed == 0 {
        println!("{}", "...No work...".bold());
        println!("{}", "Migrations are up to date".cyan());
    } else {
        println!(
            "{} {} migration{} applied",
            "up complete:".green().bold(),
            summary.executed,
            if summary.executed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

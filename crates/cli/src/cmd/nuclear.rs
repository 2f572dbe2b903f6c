//! Nuclear recovery: revert from ledger-stored contents

use crate::source::ScriptCompiler;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

pub async fn run(yes: bool) -> Result<()> {
    println!(
        "{}",
        "Nuclear mode reverts every ledger record from its stored script,"
            .yellow()
    );
    println!(
        "{}",
        "ignoring the local migration files entirely.".yellow()
    );

    if !yes && !confirm()? {
        println!("Aborted.");
        return Ok(());
    }

    let migrator = util::open_migrator()?;
    let summary = migrator.nuclear(&ScriptCompiler).await?;

    if summary.executed == 0 {
        println!("{}", "Ledger is empty - nothing to revert".cyan());
    } else {
        println!(
            "{} {} record{} reverted from stored contents",
            "nuclear complete:".green().bold(),
            summary.executed,
            if summary.executed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

fn confirm() -> Result<bool> {
    print!("Type 'yes' to continue: ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

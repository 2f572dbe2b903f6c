//! Print the number of pending migrations

use crate::util;
use anyhow::Result;

pub async fn run() -> Result<()> {
    let migrator = util::open_migrator()?;
    let delta = migrator.delta().await?;

    // bare number on stdout so scripts can consume it
    println!("{delta}");
    Ok(())
}

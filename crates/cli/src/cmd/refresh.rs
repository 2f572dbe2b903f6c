//! Revert everything, then reapply the whole catalog

use crate::cmd;
use anyhow::Result;

pub async fn run() -> Result<()> {
    cmd::down::run(None).await?;
    cmd::up::run(None).await
}

//! Scaffold the next migration script

use crate::config;
use anyhow::{bail, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use stratum_core::unit::sequence_key_of;

const SCRIPT_TEMPLATE: &str = r#"{
  "up": [],
  "down": []
}
"#;

pub async fn run(name: &str) -> Result<()> {
    let loaded = config::load()?;
    let dir = loaded.migrations_dir();
    std::fs::create_dir_all(&dir)?;

    let name = sanitize(name)?;
    let sequence = next_sequence(&dir)?;
    let file = format!("{sequence:04}_{name}.json");
    let path = dir.join(&file);

    std::fs::write(&path, SCRIPT_TEMPLATE)?;
    println!("{} {}", "Created".green().bold(), path.display());
    Ok(())
}

fn sanitize(name: &str) -> Result<String> {
    let name: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .collect();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("migration names must be alphanumeric (got '{name}')");
    }
    Ok(name)
}

/// One past the highest sequence prefix already present.
fn next_sequence(dir: &Path) -> Result<i64> {
    let mut max = 0;
    for entry in std::fs::read_dir(dir)? {
        let file = entry?.file_name().to_string_lossy().into_owned();
        if let Some(key) = sequence_key_of(&file) {
            max = max.max(key);
        }
    }
    Ok(max + 1)
}

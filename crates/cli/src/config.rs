//! stratum.toml discovery and loading
//!
//! The config file is found by walking up from the current directory, so
//! commands work from anywhere inside a project. All relative paths in
//! the file resolve against the directory that contains it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stratum_core::RunConfig;

pub const CONFIG_FILE: &str = "stratum.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory of migration scripts, relative to the config file.
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    /// Name of the ledger table.
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,
    /// Location of the embedded store database.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Recorded as run_by on ledger records. Falls back to $USER.
    #[serde(default)]
    pub actor: Option<String>,
    /// Store raw script bytes on ledger records (required for nuclear).
    #[serde(default = "default_store_contents")]
    pub store_contents: bool,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_ledger_table() -> String {
    "stratum_ledger".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".stratum/store")
}

fn default_store_contents() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            ledger_table: default_ledger_table(),
            store_path: default_store_path(),
            actor: None,
            store_contents: default_store_contents(),
        }
    }
}

/// A loaded configuration plus the directory it was found in.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub root: PathBuf,
    pub config: CliConfig,
}

impl Loaded {
    pub fn migrations_dir(&self) -> PathBuf {
        self.resolve(&self.config.migrations_dir)
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.config.store_path)
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            ledger_table: self.config.ledger_table.clone(),
            actor: self.actor(),
            store_contents: self.config.store_contents,
        }
    }

    fn actor(&self) -> String {
        if let Some(actor) = &self.config.actor {
            return actor.clone();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Walk up from cwd until a stratum.toml is found.
pub fn find_root() -> Result<PathBuf> {
    let mut current = std::env::current_dir().context("failed to get current directory")?;

    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!(
                "found no {CONFIG_FILE} in this directory or any parent; run 'stratum init' first"
            ),
        }
    }
}

pub fn load() -> Result<Loaded> {
    let root = find_root()?;
    load_from(&root)
}

pub fn load_from(root: &Path) -> Result<Loaded> {
    let path = root.join(CONFIG_FILE);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: CliConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Loaded {
        root: root.to_path_buf(),
        config,
    })
}

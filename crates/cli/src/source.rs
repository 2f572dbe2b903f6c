//! Script-file migration catalog
//!
//! Discovers `NNNN_name.json` scripts in the migrations directory and
//! turns them into migration units whose bodies execute the script ops.
//! The raw file bytes ride along as unit contents so nuclear recovery can
//! replay the `down` ops from the ledger alone.

use crate::script::{self, Script, ScriptOp};
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use stratum_core::unit::sequence_key_of;
use stratum_core::{
    ContentCompiler, Error, LedgerRecord, MigrationContext, MigrationSource, MigrationUnit, UnitFn,
};
use tracing::warn;

pub struct ScriptSource {
    dir: PathBuf,
}

impl ScriptSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MigrationSource for ScriptSource {
    fn ordered_units(&self) -> stratum_core::Result<Vec<MigrationUnit>> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                Error::Configuration(format!(
                    "could not create migrations directory {}: {e}",
                    self.dir.display()
                ))
            })?;
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            Error::Configuration(format!(
                "could not read migrations directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let mut units = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Configuration(e.to_string()))?;
            let path = entry.path();
            if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let file = entry.file_name().to_string_lossy().into_owned();
            if sequence_key_of(&file).is_none() {
                warn!(file = %file, "skipping script without a numeric sequence prefix");
                continue;
            }

            let bytes = std::fs::read(&path).map_err(|e| {
                Error::Configuration(format!("could not read {}: {e}", path.display()))
            })?;
            let parsed = Script::parse(&bytes)
                .map_err(|e| Error::Configuration(format!("{file}: {e:#}")))?;

            let unit = MigrationUnit::new(
                file,
                script_fn(Arc::new(parsed.up)),
                script_fn(Arc::new(parsed.down)),
            )?
            .with_contents(bytes);
            units.push(unit);
        }

        units.sort_by(|a, b| {
            a.sequence_key
                .cmp(&b.sequence_key)
                .then_with(|| a.file.cmp(&b.file))
        });
        Ok(units)
    }
}

fn script_fn(ops: Arc<Vec<ScriptOp>>) -> UnitFn {
    Arc::new(
        move |ctx: &MigrationContext| -> BoxFuture<'_, anyhow::Result<()>> {
            let ops = Arc::clone(&ops);
            Box::pin(async move { script::execute(&ops, ctx).await })
        },
    )
}

/// Recompiles a revert function from the script bytes a ledger record
/// carries. This is the nuclear-mode counterpart of [`ScriptSource`].
pub struct ScriptCompiler;

impl ContentCompiler for ScriptCompiler {
    fn compile_revert(&self, record: &LedgerRecord) -> anyhow::Result<UnitFn> {
        let bytes = record
            .contents
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("record '{}' has no stored contents", record.file))?;
        let script = Script::parse(bytes)?;
        Ok(script_fn(Arc::new(script.down)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    #[test]
    fn discovers_scripts_in_sequence_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "0002_b.json", "{}");
        write(&dir, "0001_a.json", "{}");
        write(&dir, "0010_j.json", "{}");
        write(&dir, "notes.txt", "not a migration");

        let units = ScriptSource::new(dir.path()).ordered_units().unwrap();
        let files: Vec<&str> = units.iter().map(|u| u.file.as_str()).collect();
        assert_eq!(files, ["0001_a.json", "0002_b.json", "0010_j.json"]);
        assert!(units.iter().all(|u| u.contents.is_some()));
    }

    #[test]
    fn missing_directory_is_created_and_empty() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("migrations");
        let units = ScriptSource::new(&nested).ordered_units().unwrap();
        assert!(units.is_empty());
        assert!(nested.is_dir());
    }

    #[test]
    fn scripts_without_numeric_prefix_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "0001_a.json", "{}");
        write(&dir, "helpers.json", "{}");

        let units = ScriptSource::new(dir.path()).ordered_units().unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn malformed_script_fails_discovery() {
        let dir = TempDir::new().unwrap();
        write(&dir, "0001_a.json", "{ not json");

        let err = ScriptSource::new(dir.path()).ordered_units().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn compiler_round_trips_down_ops() {
        let record = LedgerRecord {
            id: 1,
            name: "a".into(),
            run_date: 0,
            run_by: "tester".into(),
            file: "0001_a.json".into(),
            contents: Some(
                br#"{ "down": [{ "op": "delete_table", "table": "users" }] }"#.to_vec(),
            ),
        };
        assert!(ScriptCompiler.compile_revert(&record).is_ok());

        let empty = LedgerRecord {
            contents: None,
            ..record
        };
        assert!(ScriptCompiler.compile_revert(&empty).is_err());
    }
}

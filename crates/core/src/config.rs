//! Per-run configuration
//!
//! A `RunConfig` is a plain value handed to [`crate::Migrator::new`]; there
//! is no process-wide configuration state.

use crate::store::TableSpec;

/// Configuration for a single migration run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the ledger table holding execution records.
    pub ledger_table: String,
    /// Recorded as `run_by` on every ledger record written by this run.
    pub actor: String,
    /// Store each unit's raw source bytes on its ledger record, enabling
    /// nuclear recovery.
    pub store_contents: bool,
}

impl RunConfig {
    pub fn new(ledger_table: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            ledger_table: ledger_table.into(),
            actor: actor.into(),
            store_contents: true,
        }
    }

    /// Table definition for the ledger: numeric `id` hash key.
    pub fn table_spec(&self) -> TableSpec {
        TableSpec::new(&self.ledger_table, "id")
    }
}

//! Ledger record data structure

use crate::config::RunConfig;
use crate::unit::MigrationUnit;
use serde::{Deserialize, Serialize};

/// One row of the execution ledger: proof that a migration unit ran.
///
/// `id` equals the unit's sequence key and doubles as the table's primary
/// key. `contents` carries the unit's raw source bytes when the run was
/// configured to store them, which is what nuclear recovery replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: i64,
    pub name: String,
    /// Unix milliseconds at which the unit was applied.
    pub run_date: i64,
    pub run_by: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<u8>>,
}

impl LedgerRecord {
    /// Build the record for a freshly applied unit.
    pub fn for_applied(unit: &MigrationUnit, config: &RunConfig, run_date_ms: i64) -> Self {
        Self {
            id: unit.sequence_key,
            name: unit.name.clone(),
            run_date: run_date_ms,
            run_by: config.actor.clone(),
            file: unit.file.clone(),
            contents: if config.store_contents {
                unit.contents.clone()
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_json() {
        let record = LedgerRecord {
            id: 3,
            name: "add_users".into(),
            run_date: 1_700_000_000_000,
            run_by: "ops".into(),
            file: "0003_add_users.json".into(),
            contents: Some(b"{}".to_vec()),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["file"], "0003_add_users.json");

        let back: LedgerRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn contents_is_omitted_when_absent() {
        let record = LedgerRecord {
            id: 1,
            name: "init".into(),
            run_date: 0,
            run_by: "ops".into(),
            file: "0001_init.json".into(),
            contents: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("contents").is_none());
    }
}

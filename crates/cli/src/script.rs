//! Migration script dialect
//!
//! A migration script is a JSON file with `up` and `down` op lists. Ops
//! map one-to-one onto the ledger store's capability surface, so a script
//! can be replayed later from its stored bytes (nuclear recovery) without
//! any local state.
//!
//! ```json
//! {
//!   "up": [
//!     { "op": "create_table", "table": "users" },
//!     { "op": "put", "table": "users", "items": [{ "id": 1, "name": "ada" }] }
//!   ],
//!   "down": [
//!     { "op": "delete_table", "table": "users" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stratum_core::{MigrationContext, TableSpec};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    CreateTable {
        table: String,
        #[serde(default = "default_hash_key")]
        hash_key: String,
    },
    DeleteTable {
        table: String,
    },
    Put {
        table: String,
        items: Vec<Value>,
    },
    Delete {
        table: String,
        key: i64,
    },
}

fn default_hash_key() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub up: Vec<ScriptOp>,
    #[serde(default)]
    pub down: Vec<ScriptOp>,
}

impl Script {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("invalid migration script")
    }
}

/// Run one op list against the store exposed by the migration context.
pub async fn execute(ops: &[ScriptOp], ctx: &MigrationContext) -> Result<()> {
    for op in ops {
        debug!(?op, "executing script op");
        match op {
            ScriptOp::CreateTable { table, hash_key } => {
                ctx.store()
                    .create_table(&TableSpec::new(table, hash_key))
                    .await?;
            }
            ScriptOp::DeleteTable { table } => {
                ctx.store().delete_table(table).await?;
            }
            ScriptOp::Put { table, items } => {
                ctx.store().batch_put(table, items.clone()).await?;
            }
            ScriptOp::Delete { table, key } => {
                ctx.store().delete_item(table, *key).await?;
            }
        }
    }
    Ok(())
}

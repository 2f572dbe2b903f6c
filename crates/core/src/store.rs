//! Ledger store capability surface
//!
//! The engine consumes a table store through this trait; the concrete
//! backend (embedded sled, a remote wire protocol, an in-memory test
//! double) is injected by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a table with a single numeric hash key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub hash_key: String,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
        }
    }
}

/// Parameters for one paginated scan call.
#[derive(Debug, Clone)]
pub struct ScanParams {
    pub table: String,
    /// Resume after this key; `None` starts from the beginning.
    pub exclusive_start_key: Option<i64>,
    /// Optional cap on items returned in this page.
    pub limit: Option<usize>,
}

impl ScanParams {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            exclusive_start_key: None,
            limit: None,
        }
    }
}

/// One page of scan results. `last_evaluated_key` is the continuation
/// token; `None` means the scan is exhausted.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub items: Vec<Value>,
    pub last_evaluated_key: Option<i64>,
}

/// Durable table store consumed by the engine and exposed to migration
/// bodies through [`crate::MigrationContext`].
///
/// Contract notes:
/// - `create_table` and `delete_table` return only once the table has
///   settled into the requested existence state.
/// - `batch_put` internally splits into bounded batches and resubmits any
///   unprocessed items until none remain; callers see one logical write.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn table_exists(&self, name: &str) -> anyhow::Result<bool>;

    async fn create_table(&self, spec: &TableSpec) -> anyhow::Result<()>;

    async fn delete_table(&self, name: &str) -> anyhow::Result<()>;

    async fn scan(&self, params: ScanParams) -> anyhow::Result<ScanPage>;

    /// Write items, returning how many were persisted.
    async fn batch_put(&self, table: &str, items: Vec<Value>) -> anyhow::Result<usize>;

    async fn delete_item(&self, table: &str, key: i64) -> anyhow::Result<()>;
}

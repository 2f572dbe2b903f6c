//! In-memory ledger store for tests
//!
//! Behaves like the sled backend (registry-gated tables, paginated scans,
//! batched puts) but holds everything in process memory and can inject
//! write/delete failures to exercise the driver's recording-failure path.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use stratum_core::store::{LedgerStore, ScanPage, ScanParams, TableSpec};

struct MemTable {
    spec: TableSpec,
    items: BTreeMap<i64, Value>,
}

/// In-memory [`LedgerStore`].
pub struct MemStore {
    tables: RwLock<HashMap<String, MemTable>>,
    page_size: usize,
    fail_next_put: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: 100,
            fail_next_put: AtomicBool::new(false),
            fail_next_delete: AtomicBool::new(false),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make the next `batch_put` fail before writing anything.
    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// Make the next `delete_item` fail.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    /// Snapshot a table's items in key order, for assertions.
    pub fn items(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.items.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemStore {
    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tables.read().contains_key(name))
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(&spec.name) {
            bail!("table '{}' already exists", spec.name);
        }
        tables.insert(
            spec.name.clone(),
            MemTable {
                spec: spec.clone(),
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<()> {
        if self.tables.write().remove(name).is_none() {
            bail!("table '{name}' does not exist");
        }
        Ok(())
    }

    async fn scan(&self, params: ScanParams) -> Result<ScanPage> {
        let tables = self.tables.read();
        let table = tables
            .get(&params.table)
            .ok_or_else(|| anyhow!("table '{}' does not exist", params.table))?;

        let page_limit = params
            .limit
            .map(|l| l.min(self.page_size))
            .unwrap_or(self.page_size);

        let lower = match params.exclusive_start_key {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };

        let mut items = Vec::new();
        let mut last_key = None;
        let mut truncated = false;
        for (&key, value) in table.items.range((lower, Bound::Unbounded)) {
            if items.len() == page_limit {
                truncated = true;
                break;
            }
            items.push(value.clone());
            last_key = Some(key);
        }

        Ok(ScanPage {
            items,
            last_evaluated_key: if truncated { last_key } else { None },
        })
    }

    async fn batch_put(&self, table: &str, items: Vec<Value>) -> Result<usize> {
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            bail!("injected put failure");
        }

        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table '{table}' does not exist"))?;

        let total = items.len();
        for item in items {
            let key = item
                .get(&table.spec.hash_key)
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    anyhow!(
                        "item is missing numeric hash key '{}' for table '{}'",
                        table.spec.hash_key,
                        table.spec.name
                    )
                })?;
            table.items.insert(key, item);
        }
        Ok(total)
    }

    async fn delete_item(&self, table: &str, key: i64) -> Result<()> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            bail!("injected delete failure");
        }

        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("table '{table}' does not exist"))?;
        table.items.remove(&key);
        Ok(())
    }
}

//! Embedded table store on sled
//!
//! Tables are sled trees registered in a dedicated registry tree. Item keys
//! are the big-endian bytes of the table's numeric hash key, so sled's
//! lexicographic iteration order is ascending key order and a scan
//! continuation token is simply the last key of the previous page.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sled::{Db, Tree};
use std::ops::Bound;
use std::path::Path;
use std::time::Duration;
use stratum_core::store::{LedgerStore, ScanPage, ScanParams, TableSpec};
use tracing::{debug, info};

/// Registry tree mapping table name -> serialized [`TableSpec`].
const REGISTRY_TREE: &str = "__stratum_tables__";

/// Per-batch item cap for `batch_put`, matching the remote-store limit the
/// wire protocol imposes.
const MAX_BATCH_ITEMS: usize = 25;

const DEFAULT_PAGE_SIZE: usize = 100;

const SETTLE_POLL: Duration = Duration::from_millis(10);
const SETTLE_ATTEMPTS: usize = 500;

/// Embedded ledger store backed by a single sled database.
pub struct SledStore {
    db: Db,
    page_size: usize,
}

impl SledStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        Ok(Self {
            db,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the scan page size. Mostly useful in tests.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn registry(&self) -> Result<Tree> {
        Ok(self.db.open_tree(REGISTRY_TREE)?)
    }

    fn spec_of(&self, name: &str) -> Result<Option<TableSpec>> {
        match self.registry()?.get(name.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn require_spec(&self, name: &str) -> Result<TableSpec> {
        self.spec_of(name)?
            .ok_or_else(|| anyhow!("table '{name}' does not exist"))
    }

    fn data_tree(&self, name: &str) -> Result<Tree> {
        Ok(self.db.open_tree(format!("table:{name}"))?)
    }

    fn key_of(spec: &TableSpec, item: &Value) -> Result<i64> {
        item.get(&spec.hash_key)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                anyhow!(
                    "item is missing numeric hash key '{}' for table '{}'",
                    spec.hash_key,
                    spec.name
                )
            })
    }

    /// Poll the registry until the table settles into the wanted existence
    /// state.
    async fn wait_for_existence(&self, name: &str, want: bool) -> Result<()> {
        for _ in 0..SETTLE_ATTEMPTS {
            let exists = self.registry()?.contains_key(name.as_bytes())?;
            if exists == want {
                return Ok(());
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
        bail!(
            "table '{name}' did not settle into the {} state",
            if want { "existing" } else { "absent" }
        )
    }

    /// Submit one batch, returning anything the store left unprocessed.
    /// Sled never leaves items unprocessed, but callers resubmit until the
    /// returned set is empty, mirroring the remote-store contract.
    fn submit_batch(&self, tree: &Tree, spec: &TableSpec, batch: &[Value]) -> Result<Vec<Value>> {
        for item in batch {
            let key = Self::key_of(spec, item)?;
            tree.insert(key.to_be_bytes(), serde_json::to_vec(item)?)?;
        }
        Ok(Vec::new())
    }

    async fn put_batch(&self, tree: &Tree, spec: &TableSpec, batch: Vec<Value>) -> Result<()> {
        let mut pending = batch;
        while !pending.is_empty() {
            pending = self.submit_batch(tree, spec, &pending)?;
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SledStore {
    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.registry()?.contains_key(name.as_bytes())?)
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let registry = self.registry()?;
        if registry.contains_key(spec.name.as_bytes())? {
            bail!("table '{}' already exists", spec.name);
        }

        registry.insert(spec.name.as_bytes(), serde_json::to_vec(spec)?)?;
        self.data_tree(&spec.name)?;
        self.db.flush_async().await?;
        self.wait_for_existence(&spec.name, true).await?;

        info!(table = %spec.name, "created table");
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<()> {
        let registry = self.registry()?;
        if !registry.contains_key(name.as_bytes())? {
            bail!("table '{name}' does not exist");
        }

        self.db.drop_tree(format!("table:{name}"))?;
        registry.remove(name.as_bytes())?;
        self.db.flush_async().await?;
        self.wait_for_existence(name, false).await?;

        info!(table = %name, "deleted table");
        Ok(())
    }

    async fn scan(&self, params: ScanParams) -> Result<ScanPage> {
        self.require_spec(&params.table)?;
        let tree = self.data_tree(&params.table)?;

        let page_limit = params
            .limit
            .map(|l| l.min(self.page_size))
            .unwrap_or(self.page_size);

        let start;
        let iter = match params.exclusive_start_key {
            Some(key) => {
                start = key.to_be_bytes();
                tree.range::<&[u8], _>((Bound::Excluded(&start[..]), Bound::Unbounded))
            }
            None => tree.range::<&[u8], _>(..),
        };

        let mut items = Vec::new();
        let mut last_key = None;
        let mut truncated = false;
        for entry in iter {
            let (key, value) = entry?;
            if items.len() == page_limit {
                truncated = true;
                break;
            }
            let key = i64::from_be_bytes(
                key.as_ref()
                    .try_into()
                    .map_err(|_| anyhow!("malformed item key in table '{}'", params.table))?,
            );
            items.push(serde_json::from_slice(&value)?);
            last_key = Some(key);
        }

        debug!(
            table = %params.table,
            count = items.len(),
            truncated,
            "scanned page"
        );
        Ok(ScanPage {
            items,
            last_evaluated_key: if truncated { last_key } else { None },
        })
    }

    async fn batch_put(&self, table: &str, items: Vec<Value>) -> Result<usize> {
        let spec = self.require_spec(table)?;
        let tree = self.data_tree(table)?;
        let total = items.len();

        // The per-call item cap forces chunking; chunks go out concurrently
        // and each one resubmits until nothing is left unprocessed.
        let batches: Vec<Vec<Value>> = items
            .chunks(MAX_BATCH_ITEMS)
            .map(|chunk| chunk.to_vec())
            .collect();
        futures::future::try_join_all(
            batches
                .into_iter()
                .map(|batch| self.put_batch(&tree, &spec, batch)),
        )
        .await?;

        self.db.flush_async().await?;
        Ok(total)
    }

    async fn delete_item(&self, table: &str, key: i64) -> Result<()> {
        self.require_spec(table)?;
        let tree = self.data_tree(table)?;
        tree.remove(key.to_be_bytes())?;
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SledStore {
        SledStore::open(&dir.path().join("store")).unwrap()
    }

    fn spec(name: &str) -> TableSpec {
        TableSpec::new(name, "id")
    }

    #[tokio::test]
    async fn table_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert!(!store.table_exists("ledger").await.unwrap());
        store.create_table(&spec("ledger")).await.unwrap();
        assert!(store.table_exists("ledger").await.unwrap());

        // double create is an error
        assert!(store.create_table(&spec("ledger")).await.is_err());

        store.delete_table("ledger").await.unwrap();
        assert!(!store.table_exists("ledger").await.unwrap());

        // deleting an absent table is an error
        assert!(store.delete_table("ledger").await.is_err());
    }

    #[tokio::test]
    async fn scan_on_missing_table_fails() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let err = store.scan(ScanParams::table("nope")).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn batch_put_chunks_and_scan_paginates_in_key_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).with_page_size(10);
        store.create_table(&spec("ledger")).await.unwrap();

        // 60 items forces three write batches under the 25-item cap; insert
        // out of order to prove scans come back sorted.
        let items: Vec<Value> = (0..60)
            .rev()
            .map(|i| json!({ "id": i, "file": format!("{i}_m.json") }))
            .collect();
        let written = store.batch_put("ledger", items).await.unwrap();
        assert_eq!(written, 60);

        let mut seen = Vec::new();
        let mut start_key = None;
        let mut pages = 0;
        loop {
            let page = store
                .scan(ScanParams {
                    table: "ledger".into(),
                    exclusive_start_key: start_key,
                    limit: None,
                })
                .await
                .unwrap();
            pages += 1;
            seen.extend(page.items.iter().map(|i| i["id"].as_i64().unwrap()));
            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        assert_eq!(pages, 6);
        assert_eq!(seen, (0..60).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn delete_item_removes_only_that_key() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.create_table(&spec("ledger")).await.unwrap();

        let items = vec![json!({ "id": 1 }), json!({ "id": 2 })];
        store.batch_put("ledger", items).await.unwrap();
        store.delete_item("ledger", 1).await.unwrap();

        let page = store.scan(ScanParams::table("ledger")).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["id"], 2);
    }

    #[tokio::test]
    async fn item_without_hash_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.create_table(&spec("ledger")).await.unwrap();

        let err = store
            .batch_put("ledger", vec![json!({ "file": "1_a.json" })])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("hash key"));
    }
}

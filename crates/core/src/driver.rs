//! Execution driver
//!
//! Runs a plan strictly sequentially: one unit at a time, ledger updated
//! after each success, full abort on the first failure. Later units may
//! depend on earlier ones having completed, so there is no concurrent
//! application and no rollback of already-recorded progress.

use crate::config::RunConfig;
use crate::engine::{self, Direction, Op, Plan};
use crate::error::{Error, Result};
use crate::nuclear::{self, ContentCompiler};
use crate::record::LedgerRecord;
use crate::store::LedgerStore;
use crate::unit::{MigrationSource, MigrationUnit};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

/// Context handed to every migration body: store access for user-authored
/// migrations plus the run configuration.
pub struct MigrationContext {
    store: Arc<dyn LedgerStore>,
    config: RunConfig,
}

impl MigrationContext {
    pub fn new(store: Arc<dyn LedgerStore>, config: RunConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub direction: Direction,
    /// Units executed and recorded.
    pub executed: usize,
    /// Whether the ledger table was torn down (Down runs that drained it).
    pub torn_down: bool,
}

/// One line of `status` output: a catalog unit and, when it has been run,
/// its ledger record.
#[derive(Debug, Clone)]
pub struct StatusRow {
    pub file: String,
    pub record: Option<LedgerRecord>,
}

/// Orchestrates a run: snapshot catalog and ledger, plan, execute, record.
pub struct Migrator {
    store: Arc<dyn LedgerStore>,
    config: RunConfig,
    catalog: Vec<MigrationUnit>,
}

impl Migrator {
    /// Snapshot the catalog from the source. Catalog order is fixed for the
    /// lifetime of this value; reconciliation always operates on fresh
    /// ledger fetches.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        config: RunConfig,
        source: &dyn MigrationSource,
    ) -> Result<Self> {
        let catalog = source.ordered_units()?;
        Ok(Self {
            store,
            config,
            catalog,
        })
    }

    pub fn catalog(&self) -> &[MigrationUnit] {
        &self.catalog
    }

    /// Apply every unit up to the target bound that the ledger does not
    /// already cover. Aborts with [`Error::OutOfSync`] when the ledger is
    /// not a prefix of the catalog.
    pub async fn up(&self, target: Option<&str>) -> Result<RunSummary> {
        let records = engine::fetch_ledger_records(self.store.as_ref(), &self.config, false).await?;

        if engine::detect_out_of_sync(&records, &self.catalog) {
            let (expected, actual) = engine::out_of_sync_listing(&records, &self.catalog);
            return Err(Error::OutOfSync { expected, actual });
        }

        let bound = engine::compute_bound(target, &self.catalog);
        let plan = engine::compute_actionable(Direction::Up, bound, &self.catalog, &records);
        self.run(Direction::Up, plan).await
    }

    /// Revert every recorded unit, newest first. When the traversal drains
    /// the ledger completely, the ledger table is torn down afterwards.
    pub async fn down(&self, target: Option<&str>) -> Result<RunSummary> {
        let records = engine::fetch_ledger_records(self.store.as_ref(), &self.config, false).await?;

        // The bound scopes Up only; Down always plans over the full catalog.
        if target.is_some() {
            warn!("down ignores the target bound; reverting over the full catalog");
        }
        let plan =
            engine::compute_actionable(Direction::Down, self.catalog.len(), &self.catalog, &records);
        self.run(Direction::Down, plan).await
    }

    /// Revert straight from ledger-stored contents, ignoring the catalog.
    pub async fn nuclear(&self, compiler: &dyn ContentCompiler) -> Result<RunSummary> {
        warn!("nuclear recovery: reverting from ledger-stored contents, catalog is ignored");
        let records = engine::fetch_ledger_records(self.store.as_ref(), &self.config, true).await?;
        let plan = nuclear::plan_nuclear(&records, compiler)?;
        self.run(Direction::Nuclear, plan).await
    }

    /// Count of units an unbounded Up run would apply. Pure read: never
    /// creates the ledger table.
    pub async fn delta(&self) -> Result<usize> {
        let records = engine::fetch_ledger_records(self.store.as_ref(), &self.config, true).await?;
        let plan =
            engine::compute_actionable(Direction::Up, self.catalog.len(), &self.catalog, &records);
        Ok(plan.items.len())
    }

    /// Migrated/pending listing for every catalog unit. Pure read.
    pub async fn status(&self) -> Result<Vec<StatusRow>> {
        let records = engine::fetch_ledger_records(self.store.as_ref(), &self.config, true).await?;
        let mut queue: VecDeque<LedgerRecord> = records.into();

        let rows = self
            .catalog
            .iter()
            .map(|unit| {
                let record = match queue.pop_front() {
                    Some(record) if record.file == unit.file => Some(record),
                    _ => None,
                };
                StatusRow {
                    file: unit.file.clone(),
                    record,
                }
            })
            .collect();
        Ok(rows)
    }

    async fn run(&self, direction: Direction, plan: Plan) -> Result<RunSummary> {
        if plan.items.is_empty() {
            info!(%direction, "no actionable migrations");
            return Ok(RunSummary {
                direction,
                executed: 0,
                torn_down: false,
            });
        }

        let ctx = MigrationContext {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        };

        let mut executed = 0;
        for item in &plan.items {
            let func = match item.op {
                Op::Apply => &item.unit.apply,
                Op::Revert => &item.unit.revert,
            };

            func(&ctx).await.map_err(|source| Error::Execution {
                file: item.unit.file.clone(),
                direction,
                source,
            })?;

            match item.op {
                Op::Apply => {
                    let record = LedgerRecord::for_applied(
                        &item.unit,
                        &self.config,
                        Utc::now().timestamp_millis(),
                    );
                    let value =
                        serde_json::to_value(&record).map_err(|e| Error::Recording {
                            file: item.unit.file.clone(),
                            op: item.op,
                            source: e.into(),
                        })?;
                    self.store
                        .batch_put(&self.config.ledger_table, vec![value])
                        .await
                        .map_err(|source| Error::Recording {
                            file: item.unit.file.clone(),
                            op: item.op,
                            source,
                        })?;
                }
                Op::Revert => {
                    self.store
                        .delete_item(&self.config.ledger_table, item.unit.sequence_key)
                        .await
                        .map_err(|source| Error::Recording {
                            file: item.unit.file.clone(),
                            op: item.op,
                            source,
                        })?;
                }
            }

            info!("{direction} : {}", item.unit.file);
            executed += 1;
        }

        let mut torn_down = false;
        if direction == Direction::Down && plan.no_remaining {
            info!(table = %self.config.ledger_table, "no remaining migrations, tearing down ledger table");
            self.store
                .delete_table(&self.config.ledger_table)
                .await
                .map_err(Error::Store)?;
            torn_down = true;
        }

        info!("migration : complete");
        Ok(RunSummary {
            direction,
            executed,
            torn_down,
        })
    }
}

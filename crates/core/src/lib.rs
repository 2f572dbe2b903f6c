//! Ledger-reconciling migration engine
//!
//! This crate provides:
//! - Migration unit and ledger record data structures
//! - The reconciliation engine (bound computation, out-of-sync detection,
//!   actionable planning)
//! - The sequential execution driver
//! - Nuclear recovery planning from ledger-stored contents
//! - Capability traits for the ledger store and the migration catalog

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod nuclear;
pub mod record;
pub mod store;
pub mod unit;

// Re-exports
pub use config::RunConfig;
pub use driver::{MigrationContext, Migrator, RunSummary, StatusRow};
pub use engine::{ActionableItem, Direction, Op, Plan};
pub use error::{Error, Result};
pub use nuclear::ContentCompiler;
pub use record::LedgerRecord;
pub use store::{LedgerStore, ScanPage, ScanParams, TableSpec};
pub use unit::{MigrationSource, MigrationUnit, Registry, UnitFn};

//! Error taxonomy for migration runs

use crate::engine::{Direction, Op};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The run could not start: unusable or missing configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The ledger's recorded order diverges from the catalog at some
    /// position. Non-recoverable except via nuclear mode or manual
    /// correction.
    #[error("ledger is out of sync with the migration catalog")]
    OutOfSync {
        /// Ledger files in recorded order, plus a trailing placeholder for
        /// migrations not yet run.
        expected: Vec<String>,
        /// Catalog files in discovered order.
        actual: Vec<String>,
    },

    /// A unit's apply/revert function failed. The ledger was not touched
    /// for this unit, so re-running after a fix is safe.
    #[error("problem running your {direction} migration: {file}")]
    Execution {
        file: String,
        direction: Direction,
        #[source]
        source: anyhow::Error,
    },

    /// The ledger write/delete failed after the unit function succeeded.
    /// Leaves a known inconsistency that requires manual reconciliation.
    #[error("problem recording your migration to the ledger ({op}): {file}")]
    Recording {
        file: String,
        op: Op,
        #[source]
        source: anyhow::Error,
    },

    /// The ledger store itself failed.
    #[error("ledger store error")]
    Store(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

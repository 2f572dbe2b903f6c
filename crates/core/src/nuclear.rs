//! Nuclear recovery planning
//!
//! Recovery path for a catalog that can no longer be trusted to match what
//! actually ran (renamed or rewritten files). The catalog is ignored
//! entirely: each ledger record is turned into a synthetic unit whose
//! revert function is compiled from the record's stored contents, and the
//! whole set is reverted in strict descending sequence-key order.

use crate::driver::MigrationContext;
use crate::engine::{ActionableItem, Op, Plan};
use crate::error::{Error, Result};
use crate::record::LedgerRecord;
use crate::unit::{MigrationUnit, UnitFn};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::warn;

/// Turns a ledger record's stored contents back into a runnable revert
/// function. The compilation mechanism is the caller's concern; the CLI
/// injects a script compiler, library users inject their own.
pub trait ContentCompiler {
    fn compile_revert(&self, record: &LedgerRecord) -> anyhow::Result<UnitFn>;
}

/// Build the nuclear plan: one Revert per ledger record, descending.
///
/// Every record must carry stored contents; a record without them cannot
/// be replayed and fails the whole plan before anything runs.
pub fn plan_nuclear(records: &[LedgerRecord], compiler: &dyn ContentCompiler) -> Result<Plan> {
    let mut ordered: Vec<&LedgerRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.id.cmp(&a.id).then_with(|| b.file.cmp(&a.file)));

    let mut items = Vec::with_capacity(ordered.len());
    for record in ordered {
        if record.contents.is_none() {
            return Err(Error::Configuration(format!(
                "ledger record '{}' has no stored contents; nuclear recovery cannot replay it",
                record.file
            )));
        }

        let revert = compiler.compile_revert(record).map_err(|e| {
            Error::Configuration(format!(
                "could not compile stored contents of '{}': {e}",
                record.file
            ))
        })?;

        // Nuclear units never apply.
        let apply: UnitFn = Arc::new(
            |_ctx: &MigrationContext| -> BoxFuture<'_, anyhow::Result<()>> {
                Box::pin(async { anyhow::bail!("synthetic nuclear units cannot be applied") })
            },
        );

        warn!(file = %record.file, "queueing nuclear revert from ledger contents");
        items.push(ActionableItem {
            unit: MigrationUnit {
                sequence_key: record.id,
                name: record.name.clone(),
                file: record.file.clone(),
                apply,
                revert,
                contents: record.contents.clone(),
            },
            op: Op::Revert,
        });
    }

    // Teardown never triggers off a nuclear run; see DESIGN.md.
    Ok(Plan {
        items,
        no_remaining: false,
    })
}

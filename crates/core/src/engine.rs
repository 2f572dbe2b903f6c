//! Reconciliation engine
//!
//! Pure planning logic: given the ordered catalog and the fetched ledger
//! snapshot, decide which units are actionable and in which order, detect
//! divergence, and scope the run to a bound.

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::record::LedgerRecord;
use crate::store::{LedgerStore, ScanParams};
use crate::unit::MigrationUnit;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info};

/// Traversal direction for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending catalog order, applying missing units.
    Up,
    /// Descending catalog order, reverting recorded units.
    Down,
    /// Ledger-only recovery: revert from stored contents, ignore the catalog.
    Nuclear,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Nuclear => write!(f, "nuclear"),
        }
    }
}

/// What to do with an actionable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Apply,
    Revert,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Apply => write!(f, "apply"),
            Op::Revert => write!(f, "revert"),
        }
    }
}

/// A unit selected for execution in the current run.
#[derive(Debug, Clone)]
pub struct ActionableItem {
    pub unit: MigrationUnit,
    pub op: Op,
}

/// Ordered actionable set for one run.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub items: Vec<ActionableItem>,
    /// Set on Down runs whose traversal fully drained the ledger; triggers
    /// ledger-table teardown after execution.
    pub no_remaining: bool,
}

/// Resolve the caller's target into a catalog bound (exclusive index).
///
/// - absent or `"0"`: the whole catalog;
/// - positive integer `N`: through the Nth unit;
/// - negative integer: empty run;
/// - anything else: substring match against catalog identifiers. Exactly
///   one match scopes the run through that unit; zero or several matches
///   yield an empty run rather than a partial or ambiguous one.
pub fn compute_bound(target: Option<&str>, catalog: &[MigrationUnit]) -> usize {
    let target = match target {
        Some(t) if !t.trim().is_empty() => t.trim(),
        _ => return catalog.len(),
    };

    if let Ok(n) = target.parse::<i64>() {
        return if n == 0 {
            catalog.len()
        } else if n < 0 {
            0
        } else {
            n as usize
        };
    }

    // identifier fragment
    let fragment = target.strip_suffix(".json").unwrap_or(target);
    let mut matches = catalog
        .iter()
        .enumerate()
        .filter(|(_, u)| u.file.contains(fragment));
    match (matches.next(), matches.next()) {
        (Some((idx, _)), None) => idx + 1,
        _ => 0,
    }
}

/// True iff some covered position holds a record whose identifier differs
/// from the catalog unit at the same position. A ledger shorter than the
/// catalog is not by itself out of sync.
pub fn detect_out_of_sync(records: &[LedgerRecord], catalog: &[MigrationUnit]) -> bool {
    records
        .iter()
        .zip(catalog.iter())
        .any(|(record, unit)| record.file != unit.file)
}

/// Expected-vs-actual listing for the out-of-sync diagnostic: the ledger's
/// recorded order (plus a placeholder for not-yet-run units) against the
/// catalog as discovered.
pub fn out_of_sync_listing(
    records: &[LedgerRecord],
    catalog: &[MigrationUnit],
) -> (Vec<String>, Vec<String>) {
    let mut expected: Vec<String> = records.iter().map(|r| r.file.clone()).collect();
    if records.len() < catalog.len() {
        expected.push("... remaining migrations".to_string());
    }
    let actual = catalog.iter().map(|u| u.file.clone()).collect();
    (expected, actual)
}

/// Compute the ordered actionable set for Up or Down.
///
/// `catalog` and `records` are both ascending; reversal for Down happens
/// here. The bound scopes Up only. Nuclear planning lives in
/// [`crate::nuclear`] since it never consults the catalog.
pub fn compute_actionable(
    direction: Direction,
    bound: usize,
    catalog: &[MigrationUnit],
    records: &[LedgerRecord],
) -> Plan {
    match direction {
        Direction::Up => plan_up(bound, catalog, records),
        Direction::Down => plan_down(catalog, records),
        Direction::Nuclear => Plan::default(),
    }
}

fn plan_up(bound: usize, catalog: &[MigrationUnit], records: &[LedgerRecord]) -> Plan {
    let bound = bound.min(catalog.len());
    let mut queue: VecDeque<&LedgerRecord> = records.iter().collect();
    let mut items = Vec::new();

    // Lockstep walk: the ledger is a queue drained pointer-for-pointer, not
    // re-searched, so once a divergence occurs every later unit in range is
    // actionable too.
    for unit in &catalog[..bound] {
        let record = queue.pop_front();
        let actionable = match record {
            None => true,
            Some(record) => record.file != unit.file,
        };
        if actionable {
            debug!(file = %unit.file, "unit has no matching ledger record");
            items.push(ActionableItem {
                unit: unit.clone(),
                op: Op::Apply,
            });
        }
    }

    Plan {
        items,
        no_remaining: false,
    }
}

fn plan_down(catalog: &[MigrationUnit], records: &[LedgerRecord]) -> Plan {
    let mut queue: VecDeque<&LedgerRecord> = records.iter().rev().collect();
    let mut items = Vec::new();

    for unit in catalog.iter().rev() {
        match queue.front() {
            Some(record) if record.file == unit.file => {
                queue.pop_front();
                items.push(ActionableItem {
                    unit: unit.clone(),
                    op: Op::Revert,
                });
            }
            // A record without a matching unit stays queued for the next
            // comparison; only the catalog pointer advances. It is never
            // dropped, and it is never reverted from a unit it does not
            // match.
            Some(_) | None => {}
        }
    }

    Plan {
        no_remaining: queue.is_empty(),
        items,
    }
}

/// Fetch the full ledger snapshot, ascending by sequence key.
///
/// Creates the ledger table when it does not exist yet, unless the caller
/// is only listing. Pagination is accumulated iteratively until the store
/// stops returning a continuation key.
pub async fn fetch_ledger_records(
    store: &dyn LedgerStore,
    config: &RunConfig,
    list_only: bool,
) -> Result<Vec<LedgerRecord>> {
    let table = &config.ledger_table;
    let exists = store.table_exists(table).await.map_err(Error::Store)?;

    if !exists {
        if !list_only {
            info!(table = %table, "ledger table does not exist, creating it");
            store
                .create_table(&config.table_spec())
                .await
                .map_err(Error::Store)?;
        }
        return Ok(Vec::new());
    }

    let mut records: Vec<LedgerRecord> = Vec::new();
    let mut start_key: Option<i64> = None;
    loop {
        let page = store
            .scan(ScanParams {
                table: table.clone(),
                exclusive_start_key: start_key,
                limit: None,
            })
            .await
            .map_err(Error::Store)?;

        for item in page.items {
            let record: LedgerRecord = serde_json::from_value(item)
                .map_err(|e| Error::Store(anyhow::anyhow!("malformed ledger record: {e}")))?;
            records.push(record);
        }

        match page.last_evaluated_key {
            Some(key) => start_key = Some(key),
            None => break,
        }
    }

    records.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.file.cmp(&b.file)));
    debug!(count = records.len(), "fetched ledger records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::testutil::noop_unit;

    fn catalog(files: &[&str]) -> Vec<MigrationUnit> {
        files.iter().map(|f| noop_unit(f)).collect()
    }

    fn record(file: &str) -> LedgerRecord {
        LedgerRecord {
            id: crate::unit::sequence_key_of(file).unwrap(),
            name: String::new(),
            run_date: 0,
            run_by: "test".into(),
            file: file.into(),
            contents: None,
        }
    }

    fn files(plan: &Plan) -> Vec<&str> {
        plan.items.iter().map(|i| i.unit.file.as_str()).collect()
    }

    #[test]
    fn bound_defaults_to_full_catalog() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        assert_eq!(compute_bound(None, &c), 3);
        assert_eq!(compute_bound(Some(""), &c), 3);
        assert_eq!(compute_bound(Some("0"), &c), 3);
    }

    #[test]
    fn bound_accepts_positive_integer() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        assert_eq!(compute_bound(Some("2"), &c), 2);
        // past the end: planning clamps, everything runs
        assert_eq!(compute_bound(Some("9"), &c), 9);
    }

    #[test]
    fn negative_bound_is_a_noop() {
        let c = catalog(&["1_a.json", "2_b.json"]);
        assert_eq!(compute_bound(Some("-5"), &c), 0);
    }

    #[test]
    fn unique_fragment_scopes_through_match() {
        let c = catalog(&["1_users.json", "2_orders.json", "3_audit.json"]);
        assert_eq!(compute_bound(Some("orders"), &c), 2);
        assert_eq!(compute_bound(Some("2_orders.json"), &c), 2);
    }

    #[test]
    fn ambiguous_or_unmatched_fragment_is_a_noop() {
        let c = catalog(&["1_users.json", "2_users_index.json"]);
        assert_eq!(compute_bound(Some("users"), &c), 0);
        assert_eq!(compute_bound(Some("missing"), &c), 0);
    }

    #[test]
    fn out_of_sync_is_positional_mismatch() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        assert!(!detect_out_of_sync(&[], &c));
        assert!(!detect_out_of_sync(&[record("1_a.json")], &c));
        assert!(!detect_out_of_sync(
            &[record("1_a.json"), record("2_b.json")],
            &c
        ));
        // ledger skipped position 1
        assert!(detect_out_of_sync(
            &[record("1_a.json"), record("3_c.json")],
            &c
        ));
        // mismatch at the very first position
        assert!(detect_out_of_sync(&[record("2_b.json")], &c));
    }

    #[test]
    fn out_of_sync_listing_marks_remaining() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json"), record("3_c.json")];
        let (expected, actual) = out_of_sync_listing(&l, &c);
        assert_eq!(
            expected,
            ["1_a.json", "3_c.json", "... remaining migrations"]
        );
        assert_eq!(actual, ["1_a.json", "2_b.json", "3_c.json"]);
    }

    #[test]
    fn up_applies_suffix_after_strict_prefix() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json"), record("2_b.json")];
        let plan = compute_actionable(Direction::Up, c.len(), &c, &l);
        assert_eq!(files(&plan), ["3_c.json"]);
    }

    #[test]
    fn up_on_empty_ledger_applies_everything_in_order() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let plan = compute_actionable(Direction::Up, c.len(), &c, &[]);
        assert_eq!(files(&plan), ["1_a.json", "2_b.json", "3_c.json"]);
    }

    #[test]
    fn up_with_covered_bound_is_empty() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json"), record("2_b.json")];
        let plan = compute_actionable(Direction::Up, 2, &c, &l);
        assert!(plan.items.is_empty());
    }

    #[test]
    fn up_divergence_makes_the_rest_actionable() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json"), record("3_c.json")];
        let plan = compute_actionable(Direction::Up, c.len(), &c, &l);
        // the ledger queue is drained in lockstep, so positions 1 and 2
        // both mismatch
        assert_eq!(files(&plan), ["2_b.json", "3_c.json"]);
    }

    #[test]
    fn down_reverts_in_descending_order_and_flags_drained_ledger() {
        let c = catalog(&["1_a.json", "2_b.json"]);
        let l = [record("1_a.json"), record("2_b.json")];
        let plan = compute_actionable(Direction::Down, c.len(), &c, &l);
        assert_eq!(files(&plan), ["2_b.json", "1_a.json"]);
        assert!(plan.no_remaining);
        assert!(plan.items.iter().all(|i| i.op == Op::Revert));
    }

    #[test]
    fn down_preserves_records_without_matching_units() {
        // 0_z was recorded under a catalog that no longer contains it; it
        // survives the traversal and blocks table teardown
        let c = catalog(&["1_a.json", "2_b.json"]);
        let l = [record("0_z.json"), record("1_a.json"), record("2_b.json")];
        let plan = compute_actionable(Direction::Down, c.len(), &c, &l);
        assert_eq!(files(&plan), ["2_b.json", "1_a.json"]);
        assert!(!plan.no_remaining);
    }

    #[test]
    fn down_holds_on_a_record_newer_than_the_catalog() {
        // 9_z outranks every catalog unit; it stays at the head of the
        // reversed queue and nothing matches behind it
        let c = catalog(&["1_a.json", "2_b.json"]);
        let l = [record("1_a.json"), record("2_b.json"), record("9_z.json")];
        let plan = compute_actionable(Direction::Down, c.len(), &c, &l);
        assert!(plan.items.is_empty());
        assert!(!plan.no_remaining);
    }

    #[test]
    fn down_reverts_recorded_prefix_under_a_longer_catalog() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json"), record("2_b.json")];
        let plan = compute_actionable(Direction::Down, c.len(), &c, &l);
        assert_eq!(files(&plan), ["2_b.json", "1_a.json"]);
        assert!(plan.no_remaining);
    }

    #[test]
    fn down_partial_ledger_reverts_only_recorded_units() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json")];
        let plan = compute_actionable(Direction::Down, c.len(), &c, &l);
        assert_eq!(files(&plan), ["1_a.json"]);
        assert!(plan.no_remaining);
    }

    #[test]
    fn delta_matches_unbounded_up_plan() {
        let c = catalog(&["1_a.json", "2_b.json", "3_c.json"]);
        let l = [record("1_a.json")];
        let plan = compute_actionable(Direction::Up, c.len(), &c, &l);
        assert_eq!(plan.items.len(), 2);
    }
}

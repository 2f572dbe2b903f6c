//! Migration units and the catalog that produces them

use crate::driver::MigrationContext;
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// A boxed async migration body. Receives a context exposing the ledger
/// store so user-authored migrations can touch application tables.
pub type UnitFn =
    Arc<dyn for<'a> Fn(&'a MigrationContext) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

/// One versioned migration unit from the catalog.
///
/// Units are read-only and constructed fresh each run. `file` is the
/// unit's external identifier; `sequence_key` derives from its numeric
/// prefix (the digits before the first `_`).
#[derive(Clone)]
pub struct MigrationUnit {
    pub sequence_key: i64,
    pub name: String,
    pub file: String,
    pub apply: UnitFn,
    pub revert: UnitFn,
    /// Raw source bytes, stored on the ledger record to support nuclear
    /// recovery.
    pub contents: Option<Vec<u8>>,
}

impl MigrationUnit {
    pub fn new(file: impl Into<String>, apply: UnitFn, revert: UnitFn) -> Result<Self> {
        let file = file.into();
        let sequence_key = sequence_key_of(&file).ok_or_else(|| {
            Error::Configuration(format!(
                "migration '{file}' has no numeric sequence prefix (expected NNNN_name)"
            ))
        })?;
        let name = name_of(&file);
        Ok(Self {
            sequence_key,
            name,
            file,
            apply,
            revert,
            contents: None,
        })
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = Some(contents);
        self
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("sequence_key", &self.sequence_key)
            .field("name", &self.name)
            .field("file", &self.file)
            .field("contents", &self.contents.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// Parse the numeric sequence prefix out of a unit identifier.
///
/// `"0002_add_users.json"` -> `Some(2)`. Returns `None` when the
/// identifier does not start with digits.
pub fn sequence_key_of(file: &str) -> Option<i64> {
    let stem = file.strip_suffix(".json").unwrap_or(file);
    let digits: &str = match stem.find('_') {
        Some(idx) => &stem[..idx],
        None => stem,
    };
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// The portion of the identifier after the sequence prefix.
fn name_of(file: &str) -> String {
    let stem = file.strip_suffix(".json").unwrap_or(file);
    match stem.find('_') {
        Some(idx) => stem[idx + 1..].to_string(),
        None => String::new(),
    }
}

/// Produces the ordered migration catalog.
///
/// Implementations own discovery entirely: script directories, embedded
/// registries, generated code. The engine only requires that the returned
/// sequence is sorted ascending by `(sequence_key, file)`.
pub trait MigrationSource {
    fn ordered_units(&self) -> Result<Vec<MigrationUnit>>;
}

/// In-code catalog for library users: register units directly, no file
/// discovery involved.
#[derive(Default)]
pub struct Registry {
    units: Vec<MigrationUnit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: MigrationUnit) -> &mut Self {
        self.units.push(unit);
        self
    }
}

impl MigrationSource for Registry {
    fn ordered_units(&self) -> Result<Vec<MigrationUnit>> {
        let mut units = self.units.clone();
        units.sort_by(|a, b| {
            a.sequence_key
                .cmp(&b.sequence_key)
                .then_with(|| a.file.cmp(&b.file))
        });
        Ok(units)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_key_parses_numeric_prefix() {
        assert_eq!(sequence_key_of("0001_init.json"), Some(1));
        assert_eq!(sequence_key_of("20240101_seed.json"), Some(20240101));
        assert_eq!(sequence_key_of("0042"), Some(42));
        assert_eq!(sequence_key_of("init.json"), None);
        assert_eq!(sequence_key_of("_init.json"), None);
    }

    #[test]
    fn unit_splits_name_from_prefix() {
        let unit = testutil::noop_unit("0003_add_users.json");
        assert_eq!(unit.sequence_key, 3);
        assert_eq!(unit.name, "add_users");
        assert_eq!(unit.file, "0003_add_users.json");
    }

    #[test]
    fn registry_orders_by_sequence_key_then_file() {
        let mut registry = Registry::new();
        registry.register(testutil::noop_unit("0002_b.json"));
        registry.register(testutil::noop_unit("0001_a.json"));
        registry.register(testutil::noop_unit("0003_c.json"));

        let files: Vec<String> = registry
            .ordered_units()
            .unwrap()
            .into_iter()
            .map(|u| u.file)
            .collect();
        assert_eq!(files, ["0001_a.json", "0002_b.json", "0003_c.json"]);
    }

    #[test]
    fn unit_without_prefix_is_rejected() {
        let err =
            MigrationUnit::new("bad-name.json", testutil::noop_fn(), testutil::noop_fn())
                .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}

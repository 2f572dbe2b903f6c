//! Ledger store backends
//!
//! Concrete implementations of the [`stratum_core::LedgerStore`] capability
//! surface:
//! - [`SledStore`]: embedded table store on sled, with paginated scans,
//!   bounded batched writes, and existence polling
//! - [`MemStore`]: in-memory store with failure injection, for tests

pub mod mem;
pub mod sled;

// Re-exports
pub use self::mem::MemStore;
pub use self::sled::SledStore;

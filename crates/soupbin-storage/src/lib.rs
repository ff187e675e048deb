//! Durable log backends implementing `soupbin_core::storage::Storage`.
//!
//! Two implementations are provided: [`MemoryStorage`], for tests and
//! simulation, and [`RedbStorage`], for production use. Both are exercised by
//! the same conformance suite in `tests/conformance.rs` so they agree on
//! observable behavior.

mod key;
mod memory;
mod redb_backend;

pub use memory::MemoryStorage;
pub use redb_backend::RedbStorage;

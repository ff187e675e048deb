//! Redb-backed durable storage.
//!
//! Uses redb's ACID transactions with copy-on-write for crash safety. The
//! durable-before-send invariant relies on `store_output`'s commit
//! completing before the session dispatches the corresponding frame.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use soupbin_core::storage::{LogEntry, Storage, StorageError};

use crate::key;

const INPUT: TableDefinition<&[u8], &[u8]> = TableDefinition::new("input");
const OUTPUT: TableDefinition<&[u8], &[u8]> = TableDefinition::new("output");

/// Durable storage backed by redb.
///
/// Thread-safe through redb's internal locking; `Clone` is cheap (`Arc`).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a redb database at `path`, creating the input/output
    /// tables if they don't already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|error| StorageError::Open {
            name: path.display().to_string(),
            source: std::io::Error::other(error),
        })?;

        let txn = db.begin_write().map_err(|error| StorageError::Io(error.to_string()))?;
        {
            let _ = txn.open_table(INPUT).map_err(|error| StorageError::Io(error.to_string()))?;
            let _ = txn.open_table(OUTPUT).map_err(|error| StorageError::Io(error.to_string()))?;
        }
        txn.commit().map_err(|error| StorageError::Io(error.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn append(
        &self,
        table: TableDefinition<'_, &[u8], &[u8]>,
        name: &str,
        body: &[u8],
    ) -> Result<u64, StorageError> {
        let txn = self.db.begin_write().map_err(|error| StorageError::Io(error.to_string()))?;
        let sequence = {
            let mut handle = txn.open_table(table).map_err(|error| StorageError::Io(error.to_string()))?;
            let sequence = next_sequence(&handle, name)?;
            let key = key::encode(name, sequence);
            handle
                .insert(key.as_slice(), body)
                .map_err(|error| StorageError::Io(error.to_string()))?;
            sequence
        };
        txn.commit().map_err(|error| StorageError::Io(error.to_string()))?;
        Ok(sequence)
    }

    fn load(
        &self,
        table: TableDefinition<'_, &[u8], &[u8]>,
        name: &str,
        from_sequence: u64,
    ) -> Result<Vec<LogEntry>, StorageError> {
        let txn = self.db.begin_read().map_err(|error| StorageError::Io(error.to_string()))?;
        let handle = txn.open_table(table).map_err(|error| StorageError::Io(error.to_string()))?;

        let start = key::encode(name, from_sequence);
        let (_, end) = key::bounds(name);

        let mut entries = Vec::new();
        for row in
            handle.range(start.as_slice()..=end.as_slice()).map_err(|error| StorageError::Io(error.to_string()))?
        {
            let (stored_key, value) = row.map_err(|error| StorageError::Io(error.to_string()))?;
            let sequence = key::decode_sequence(stored_key.value());
            entries.push(LogEntry { sequence, body: value.value().to_vec() });
        }
        Ok(entries)
    }
}

fn next_sequence<T: ReadableTable<&'static [u8], &'static [u8]>>(
    table: &T,
    name: &str,
) -> Result<u64, StorageError> {
    let (start, end) = key::bounds(name);
    let mut latest = None;
    for row in table.range(start.as_slice()..=end.as_slice()).map_err(|error| StorageError::Io(error.to_string()))? {
        let (stored_key, _) = row.map_err(|error| StorageError::Io(error.to_string()))?;
        latest = Some(key::decode_sequence(stored_key.value()));
    }
    Ok(latest.map_or(1, |last| last + 1))
}

impl Storage for RedbStorage {
    fn open(&self, name: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|error| StorageError::Io(error.to_string()))?;
        {
            let input = txn.open_table(INPUT).map_err(|error| StorageError::Io(error.to_string()))?;
            let (start, end) = key::bounds(name);
            let _ = input
                .range(start.as_slice()..=end.as_slice())
                .map_err(|error| StorageError::Io(error.to_string()))?;
        }
        txn.commit().map_err(|error| StorageError::Io(error.to_string()))?;
        Ok(())
    }

    fn store_output(&self, name: &str, body: &[u8]) -> Result<u64, StorageError> {
        self.append(OUTPUT, name, body)
    }

    fn load_output(&self, name: &str, from_sequence: u64) -> Result<Vec<LogEntry>, StorageError> {
        self.load(OUTPUT, name, from_sequence)
    }

    fn store_input(&self, name: &str, body: &[u8]) -> Result<u64, StorageError> {
        self.append(INPUT, name, body)
    }

    fn load_input(&self, name: &str) -> Result<Vec<LogEntry>, StorageError> {
        self.load(INPUT, name, 0)
    }
}

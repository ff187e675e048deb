#![allow(clippy::disallowed_types, reason = "synchronous in-memory operations only")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use soupbin_core::storage::{LogEntry, Storage, StorageError};

/// In-memory durable log, for tests and simulation.
///
/// `Clone` is cheap (`Arc`); all clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<String, Logs>>>,
}

#[derive(Default)]
struct Logs {
    input: Vec<LogEntry>,
    output: Vec<LogEntry>,
}

impl MemoryStorage {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    #[allow(clippy::expect_used)]
    fn open(&self, name: &str) -> Result<(), StorageError> {
        self.inner.lock().expect("storage mutex poisoned").entry(name.to_string()).or_default();
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn store_output(&self, name: &str, body: &[u8]) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        let logs = inner.entry(name.to_string()).or_default();
        #[allow(clippy::cast_possible_truncation)]
        let sequence = logs.output.len() as u64 + 1;
        logs.output.push(LogEntry { sequence, body: body.to_vec() });
        Ok(sequence)
    }

    #[allow(clippy::expect_used)]
    fn load_output(&self, name: &str, from_sequence: u64) -> Result<Vec<LogEntry>, StorageError> {
        let inner = self.inner.lock().expect("storage mutex poisoned");
        Ok(inner
            .get(name)
            .map(|logs| {
                logs.output.iter().filter(|entry| entry.sequence >= from_sequence).cloned().collect()
            })
            .unwrap_or_default())
    }

    #[allow(clippy::expect_used)]
    fn store_input(&self, name: &str, body: &[u8]) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().expect("storage mutex poisoned");
        let logs = inner.entry(name.to_string()).or_default();
        #[allow(clippy::cast_possible_truncation)]
        let sequence = logs.input.len() as u64 + 1;
        logs.input.push(LogEntry { sequence, body: body.to_vec() });
        Ok(sequence)
    }

    #[allow(clippy::expect_used)]
    fn load_input(&self, name: &str) -> Result<Vec<LogEntry>, StorageError> {
        let inner = self.inner.lock().expect("storage mutex poisoned");
        Ok(inner.get(name).map(|logs| logs.input.clone()).unwrap_or_default())
    }
}

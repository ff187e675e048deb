//! Durable sequence log abstraction.
//!
//! Each session owns two logical append-only logs, *input* and *output*, each
//! keyed by a strictly monotone sequence number. The trait is synchronous: a
//! session only ever touches its log from within its own serialization
//! domain, so no internal locking is required beyond what the backing store
//! imposes on itself.

use thiserror::Error;

/// A single logged row: its assigned sequence and opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Sequence number assigned when the row was stored.
    pub sequence: u64,
    /// Opaque message body.
    pub body: Vec<u8>,
}

/// Failures from the durable log.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be opened or created.
    #[error("failed to open storage for {name}: {source}")]
    Open {
        /// Session log name that failed to open.
        name: String,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// A read or write transaction against the backing store failed.
    #[error("storage operation failed: {0}")]
    Io(String),
}

/// The durable sequence log contract consumed by the session core.
///
/// Implementations must be `Clone` (cheaply, e.g. via `Arc`) so a handle can
/// be held by the session without fighting its ownership model, and
/// `Send + Sync` so a handle can cross the boundary into a spawned duty.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Open (or create) the two logical tables for a session named `name`.
    ///
    /// Idempotent: calling this again on an already-open handle is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the backing store cannot be opened.
    fn open(&self, name: &str) -> Result<(), StorageError>;

    /// Append `body` to `name`'s output table, durably, returning the
    /// assigned sequence. The assigned sequence is strictly greater than any
    /// previously assigned sequence for this log.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the append could not be committed.
    fn store_output(&self, name: &str, body: &[u8]) -> Result<u64, StorageError>;

    /// Return output rows with `sequence >= from_sequence`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the scan fails.
    fn load_output(&self, name: &str, from_sequence: u64) -> Result<Vec<LogEntry>, StorageError>;

    /// Append `body` to `name`'s input table, durably, returning the assigned
    /// sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the append could not be committed.
    fn store_input(&self, name: &str, body: &[u8]) -> Result<u64, StorageError>;

    /// Return every row of `name`'s input table in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the scan fails.
    fn load_input(&self, name: &str) -> Result<Vec<LogEntry>, StorageError>;
}

/// A session's durable log: a shared [`Storage`] handle bound to one log name.
///
/// The session core only ever deals with its own log, so this wrapper hides
/// the `name` parameter the underlying shared store needs to tell sessions
/// apart, leaving plain unparameterized store/load operations.
#[derive(Clone)]
pub struct SessionLog<S: Storage> {
    storage: S,
    name: Option<String>,
}

impl<S: Storage> SessionLog<S> {
    /// Build a log handle bound to no name yet; `open` must be called before
    /// any store/load operation.
    pub fn unopened(storage: S) -> Self {
        Self { storage, name: None }
    }

    /// Build a log handle already bound to `name`, opening it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the backing store cannot be opened.
    pub fn open(storage: S, name: impl Into<String>) -> Result<Self, StorageError> {
        let mut log = Self::unopened(storage);
        log.open_as(name)?;
        Ok(log)
    }

    /// Bind this handle to `name`, opening (or reopening) its tables.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the backing store cannot be opened.
    pub fn open_as(&mut self, name: impl Into<String>) -> Result<(), StorageError> {
        let name = name.into();
        self.storage.open(&name)?;
        self.name = Some(name);
        Ok(())
    }

    /// The log name once opened.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn bound_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| {
            unreachable!("invariant: session log used before open_as was called")
        })
    }

    /// See [`Storage::store_output`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the append could not be committed.
    pub fn store_output(&self, body: &[u8]) -> Result<u64, StorageError> {
        self.storage.store_output(self.bound_name(), body)
    }

    /// See [`Storage::load_output`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the scan fails.
    pub fn load_output(&self, from_sequence: u64) -> Result<Vec<LogEntry>, StorageError> {
        self.storage.load_output(self.bound_name(), from_sequence)
    }

    /// See [`Storage::store_input`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the append could not be committed.
    pub fn store_input(&self, body: &[u8]) -> Result<u64, StorageError> {
        self.storage.store_input(self.bound_name(), body)
    }

    /// See [`Storage::load_input`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the scan fails.
    pub fn load_input(&self) -> Result<Vec<LogEntry>, StorageError> {
        self.storage.load_input(self.bound_name())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use proptest::prelude::*;

    use super::*;

    #[derive(Clone, Default)]
    struct VecStorage {
        output: Arc<Mutex<Vec<LogEntry>>>,
    }

    impl Storage for VecStorage {
        fn open(&self, _name: &str) -> Result<(), StorageError> {
            Ok(())
        }

        fn store_output(&self, _name: &str, body: &[u8]) -> Result<u64, StorageError> {
            let mut output = self.output.lock().unwrap();
            let sequence = output.len() as u64 + 1;
            output.push(LogEntry { sequence, body: body.to_vec() });
            Ok(sequence)
        }

        fn load_output(&self, _name: &str, from_sequence: u64) -> Result<Vec<LogEntry>, StorageError> {
            Ok(self.output.lock().unwrap().iter().filter(|e| e.sequence >= from_sequence).cloned().collect())
        }

        fn store_input(&self, _name: &str, _body: &[u8]) -> Result<u64, StorageError> {
            unreachable!("not exercised by this test")
        }

        fn load_input(&self, _name: &str) -> Result<Vec<LogEntry>, StorageError> {
            unreachable!("not exercised by this test")
        }
    }

    #[derive(Debug, Clone)]
    enum SendKind {
        Sequenced(Vec<u8>),
        Unsequenced,
    }

    fn send_strategy() -> impl Strategy<Value = SendKind> {
        prop_oneof![
            proptest::collection::vec(any::<u8>(), 0..16).prop_map(SendKind::Sequenced),
            Just(SendKind::Unsequenced),
        ]
    }

    proptest! {
        #[test]
        fn interleaved_unsequenced_sends_do_not_perturb_output_order(
            sends in proptest::collection::vec(send_strategy(), 0..64)
        ) {
            // Unsequenced sends never touch the output log (they aren't durable
            // and carry no sequence), so interleaving them with sequenced sends
            // must not perturb the relative order the sequenced ones land in.
            let log = SessionLog::open(VecStorage::default(), "session").unwrap();
            let mut expected = Vec::new();
            for send in &sends {
                if let SendKind::Sequenced(body) = send {
                    let sequence = log.store_output(body).unwrap();
                    expected.push((sequence, body.clone()));
                }
            }

            let stored = log.load_output(0).unwrap();
            prop_assert_eq!(stored.len(), expected.len());
            for (entry, (sequence, body)) in stored.iter().zip(expected.iter()) {
                prop_assert_eq!(entry.sequence, *sequence);
                prop_assert_eq!(&entry.body, body);
            }
            let sequences: Vec<u64> = stored.iter().map(|e| e.sequence).collect();
            let mut sorted = sequences.clone();
            sorted.sort_unstable();
            prop_assert_eq!(sequences, sorted);
        }
    }
}

//! A single behavioral contract, run against both storage backends, so they
//! cannot silently drift apart.

use soupbin_core::storage::Storage;
use soupbin_storage::{MemoryStorage, RedbStorage};

fn assigns_increasing_sequences(storage: impl Storage) {
    storage.open("session1").unwrap();
    let first = storage.store_output("session1", b"one").unwrap();
    let second = storage.store_output("session1", b"two").unwrap();
    let third = storage.store_output("session1", b"three").unwrap();
    assert_eq!((first, second, third), (1, 2, 3));
}

fn input_and_output_are_independent_logs(storage: impl Storage) {
    storage.open("session1").unwrap();
    storage.store_output("session1", b"out").unwrap();
    let input_sequence = storage.store_input("session1", b"in").unwrap();
    assert_eq!(input_sequence, 1, "input sequencing must not be perturbed by output writes");
}

fn load_output_from_respects_lower_bound(storage: impl Storage) {
    storage.open("session1").unwrap();
    for body in [b"a".as_slice(), b"b", b"c", b"d"] {
        storage.store_output("session1", body).unwrap();
    }
    let entries = storage.load_output("session1", 3).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sequence, 3);
    assert_eq!(entries[1].sequence, 4);
}

fn load_input_returns_full_history_in_order(storage: impl Storage) {
    storage.open("session1").unwrap();
    for body in [b"a".as_slice(), b"b", b"c"] {
        storage.store_input("session1", body).unwrap();
    }
    let entries = storage.load_input("session1").unwrap();
    let sequences: Vec<u64> = entries.iter().map(|entry| entry.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

fn distinct_session_names_do_not_share_sequences(storage: impl Storage) {
    storage.open("session1").unwrap();
    storage.open("session2").unwrap();
    storage.store_output("session1", b"x").unwrap();
    let first_for_session2 = storage.store_output("session2", b"y").unwrap();
    assert_eq!(first_for_session2, 1);
}

fn empty_log_loads_as_empty(storage: impl Storage) {
    storage.open("session1").unwrap();
    assert!(storage.load_output("session1", 0).unwrap().is_empty());
    assert!(storage.load_input("session1").unwrap().is_empty());
}

macro_rules! conformance_suite {
    ($backend:ident, $make:expr) => {
        mod $backend {
            use super::*;

            #[test]
            fn assigns_increasing_sequences() {
                super::assigns_increasing_sequences($make);
            }

            #[test]
            fn input_and_output_are_independent_logs() {
                super::input_and_output_are_independent_logs($make);
            }

            #[test]
            fn load_output_from_respects_lower_bound() {
                super::load_output_from_respects_lower_bound($make);
            }

            #[test]
            fn load_input_returns_full_history_in_order() {
                super::load_input_returns_full_history_in_order($make);
            }

            #[test]
            fn distinct_session_names_do_not_share_sequences() {
                super::distinct_session_names_do_not_share_sequences($make);
            }

            #[test]
            fn empty_log_loads_as_empty() {
                super::empty_log_loads_as_empty($make);
            }
        }
    };
}

conformance_suite!(memory, MemoryStorage::new());
conformance_suite!(
    redb,
    RedbStorage::open(tempfile::tempdir().unwrap().into_path().join("conformance.redb")).unwrap()
);

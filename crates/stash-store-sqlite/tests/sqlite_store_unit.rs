// crates/stash-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite KeyValueStore behavior.
// Purpose: Ensure durable persistence, atomic batches, and integrity checks.
// Dependencies: stash-store-sqlite, stash-core, rusqlite, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the `SQLite`-backed key-value store. Exercises the
//! full operation surface plus adversarial storage conditions: corrupted
//! rows, foreign schema versions, hostile paths, and oversized payloads.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use serde_json::json;
use stash_core::Entry;
use stash_core::Key;
use stash_core::KeyValueStore;
use stash_core::SharedKvStore;
use stash_core::StoreError;
use stash_store_sqlite::MAX_VALUE_BYTES;
use stash_store_sqlite::SqliteKvStore;
use stash_store_sqlite::SqliteStoreConfig;
use stash_store_sqlite::SqliteStoreError;
use stash_store_sqlite::SqliteStoreMode;
use stash_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn key(raw: &str) -> Key {
    Key::new(raw).expect("valid key")
}

fn store_for(path: &std::path::Path) -> SqliteKvStore {
    let config = SqliteStoreConfig {
        path: path.to_path_buf(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
        max_value_bytes: None,
    };
    SqliteKvStore::new(config).expect("store init")
}

fn entries_by_key(store: &SqliteKvStore) -> BTreeMap<String, Value> {
    store
        .list()
        .expect("list")
        .into_iter()
        .map(|entry| (entry.key.as_str().to_string(), entry.value))
        .collect()
}

// ============================================================================
// SECTION: Single-Entry Operations
// ============================================================================

#[test]
fn sqlite_store_set_get_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("a"), &json!({"x": 1})).unwrap();
    assert_eq!(store.get(&key("a")).unwrap(), Some(json!({"x": 1})));
}

#[test]
fn sqlite_store_get_missing_returns_none() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    assert_eq!(store.get(&key("missing")).unwrap(), None);
}

#[test]
fn sqlite_store_set_replaces_existing_value() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("k"), &json!("v1")).unwrap();
    store.set(&key("k"), &json!("v2")).unwrap();
    assert_eq!(store.get(&key("k")).unwrap(), Some(json!("v2")));
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn sqlite_store_set_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("k"), &json!([1, 2, 3])).unwrap();
    store.set(&key("k"), &json!([1, 2, 3])).unwrap();
    assert_eq!(store.get(&key("k")).unwrap(), Some(json!([1, 2, 3])));
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn sqlite_store_round_trips_every_json_shape() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let shapes = [
        ("null", Value::Null),
        ("bool", json!(true)),
        ("int", json!(-42)),
        ("float", json!(1.5)),
        ("string", json!("text with \"quotes\" and unicode \u{e9}")),
        ("array", json!([1, "two", null, {"three": 3}])),
        ("object", json!({"nested": {"deep": [1.0, 2]}, "empty": {}})),
    ];
    for (name, value) in &shapes {
        store.set(&key(name), value).unwrap();
    }
    for (name, value) in &shapes {
        assert_eq!(store.get(&key(name)).unwrap().as_ref(), Some(value), "shape {name}");
    }
}

#[test]
fn sqlite_store_float_and_integer_stay_distinct() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("float"), &json!(1.0)).unwrap();
    store.set(&key("int"), &json!(1)).unwrap();
    let float_back = store.get(&key("float")).unwrap().expect("float present");
    let int_back = store.get(&key("int")).unwrap().expect("int present");
    assert!(float_back.as_f64().is_some() && float_back.as_i64().is_none());
    assert_eq!(int_back, json!(1));
}

#[test]
fn sqlite_store_delete_removes_entry() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("k"), &json!("v")).unwrap();
    store.delete(&key("k")).unwrap();
    assert_eq!(store.get(&key("k")).unwrap(), None);
}

#[test]
fn sqlite_store_delete_absent_key_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.delete(&key("never-set")).unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn sqlite_store_list_returns_all_entries() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("a"), &json!({"x": 1})).unwrap();
    store.set(&key("b"), &json!([1, 2, 3])).unwrap();
    let listed = entries_by_key(&store);
    let expected: BTreeMap<String, Value> =
        [("a".to_string(), json!({"x": 1})), ("b".to_string(), json!([1, 2, 3]))].into();
    assert_eq!(listed, expected);
}

#[test]
fn sqlite_store_list_empty_store_returns_no_entries() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn sqlite_store_clear_removes_everything() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("a"), &json!(1)).unwrap();
    store.set(&key("b"), &json!(2)).unwrap();
    store.clear().unwrap();
    assert!(store.list().unwrap().is_empty());
    store.clear().unwrap();
}

// ============================================================================
// SECTION: Batch Operations
// ============================================================================

#[test]
fn sqlite_store_batch_set_last_occurrence_wins() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let entries = vec![
        Entry::new(key("p"), json!("v1")),
        Entry::new(key("p"), json!("v2")),
        Entry::new(key("q"), json!("v3")),
    ];
    store.batch_set(&entries).unwrap();
    assert_eq!(store.get(&key("p")).unwrap(), Some(json!("v2")));
    assert_eq!(store.get(&key("q")).unwrap(), Some(json!("v3")));
    assert_eq!(store.list().unwrap().len(), 2);
}

#[test]
fn sqlite_store_batch_set_empty_batch_is_noop() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("kept"), &json!(1)).unwrap();
    store.batch_set(&[]).unwrap();
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn sqlite_store_batch_delete_skips_absent_keys() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.set(&key("a"), &json!(1)).unwrap();
    store.set(&key("b"), &json!(2)).unwrap();
    store.batch_delete(&[key("a"), key("missing"), key("a")]).unwrap();
    let remaining = entries_by_key(&store);
    assert_eq!(remaining.len(), 1);
    assert!(remaining.contains_key("b"));
}

#[test]
fn sqlite_store_batch_set_leaves_store_unchanged_on_oversized_entry() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        path: temp.path().join("store.sqlite"),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
        max_value_bytes: Some(64),
    };
    let store = SqliteKvStore::new(config).expect("store init");
    store.set(&key("kept"), &json!("prior")).unwrap();

    let oversized = "x".repeat(128);
    let entries =
        vec![Entry::new(key("first"), json!("small")), Entry::new(key("second"), json!(oversized))];
    let result = store.batch_set(&entries);
    assert!(matches!(result, Err(StoreError::Invalid(_))));

    let contents = entries_by_key(&store);
    assert_eq!(contents.len(), 1);
    assert_eq!(contents.get("kept"), Some(&json!("prior")));
}

// ============================================================================
// SECTION: Limits and Validation
// ============================================================================

#[test]
fn sqlite_store_rejects_oversized_value_on_set() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        path: temp.path().join("store.sqlite"),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
        max_value_bytes: Some(16),
    };
    let store = SqliteKvStore::new(config).expect("store init");
    let result = store.set(&key("big"), &json!("x".repeat(32)));
    assert!(matches!(result, Err(StoreError::Invalid(_))));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn sqlite_store_accepts_values_at_default_limit_boundary() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    // Canonical text of a JSON string adds two quote bytes.
    let payload = "x".repeat(MAX_VALUE_BYTES - 2);
    store.set(&key("max"), &json!(payload)).unwrap();
    assert!(store.get(&key("max")).unwrap().is_some());
}

#[test]
fn sqlite_store_rejects_zero_value_limit() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig {
        path: temp.path().join("store.sqlite"),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
        max_value_bytes: Some(0),
    };
    let result = SqliteKvStore::new(config);
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().to_path_buf());
    let result = SqliteKvStore::new(config);
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_overlong_path_component() {
    let temp = TempDir::new().unwrap();
    let component = "x".repeat(300);
    let config = SqliteStoreConfig::new(temp.path().join(component));
    let result = SqliteKvStore::new(config);
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_overlong_total_path() {
    let temp = TempDir::new().unwrap();
    let component = "y".repeat(5_000);
    let config = SqliteStoreConfig::new(temp.path().join(component));
    let result = SqliteKvStore::new(config);
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_creates_missing_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("deeper").join("store.sqlite");
    let store = store_for(&path);
    store.set(&key("k"), &json!(1)).unwrap();
    assert!(path.exists());
}

// ============================================================================
// SECTION: Durability and Integrity
// ============================================================================

#[test]
fn sqlite_store_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    {
        let store = store_for(&path);
        store.set(&key("a"), &json!({"kept": true})).unwrap();
    }
    let store = store_for(&path);
    assert_eq!(store.get(&key("a")).unwrap(), Some(json!({"kept": true})));
}

#[test]
fn sqlite_store_detects_corrupt_value_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.set(&key("a"), &json!({"x": 1})).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute(
                "UPDATE entries SET value = 'not json' WHERE key = ?1",
                rusqlite::params!["a"],
            )
            .unwrap();
    }
    assert!(matches!(store.get(&key("a")), Err(StoreError::Corrupt(_))));
    assert!(matches!(store.list(), Err(StoreError::Corrupt(_))));
}

#[test]
fn sqlite_store_rejects_version_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let _store = store_for(&path);

    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 999", rusqlite::params![]).unwrap();

    let config = SqliteStoreConfig::new(path);
    let result = SqliteKvStore::new(config);
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn sqlite_store_stores_canonical_text_rows() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.set(&key("a"), &json!({"b": 2, "a": 1})).unwrap();

    let connection = rusqlite::Connection::open(&path).unwrap();
    let raw: String = connection
        .query_row("SELECT value FROM entries WHERE key = ?1", rusqlite::params!["a"], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(raw, r#"{"a":1,"b":2}"#);
}

#[test]
fn sqlite_store_wal_mode_persists_in_database_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let _store = store_for(&path);

    let connection = rusqlite::Connection::open(&path).unwrap();
    let mode: String = connection.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn sqlite_store_delete_journal_mode_leaves_wal_off() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let config = SqliteStoreConfig {
        path: path.clone(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Delete,
        sync_mode: SqliteSyncMode::Normal,
        max_value_bytes: None,
    };
    let _store = SqliteKvStore::new(config).expect("store init");

    let connection = rusqlite::Connection::open(&path).unwrap();
    let mode: String = connection.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(mode.to_lowercase(), "delete");
}

// ============================================================================
// SECTION: Concurrency and Integration
// ============================================================================

#[test]
fn sqlite_store_allows_concurrent_writers() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let mut handles = Vec::new();

    for index in 0 .. 8 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            let writer_key = key(&format!("writer-{index}"));
            store.set(&writer_key, &json!(index)).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.list().unwrap().len(), 8);
}

#[test]
fn sqlite_store_works_behind_shared_handle() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let shared = SharedKvStore::from_store(store);
    shared.set(&key("via-handle"), &json!({"ok": true})).unwrap();
    assert_eq!(shared.get(&key("via-handle")).unwrap(), Some(json!({"ok": true})));
    shared.readiness().unwrap();
}

#[test]
fn sqlite_store_readiness_succeeds_on_open_store() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.readiness().unwrap();
}

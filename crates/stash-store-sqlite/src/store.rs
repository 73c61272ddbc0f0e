// crates/stash-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Key-Value Store
// Description: Durable KeyValueStore backed by SQLite WAL.
// Purpose: Persist keyed JSON values with deterministic serialization.
// Dependencies: stash-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements a durable [`KeyValueStore`] using `SQLite`. Every
//! value is stored as canonical JSON text in a single keyed table, so on-disk
//! bytes are deterministic for equal values and round-trip losslessly through
//! the codec. Batches execute inside one transaction and either land whole or
//! not at all. Security posture: database contents are untrusted; rows that
//! fail decoding surface as corruption instead of being skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use stash_core::Entry;
use stash_core::Key;
use stash_core::KeyValueStore;
use stash_core::StoreError;
use stash_core::canonical::from_canonical_text;
use stash_core::canonical::to_canonical_text;
use thiserror::Error;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum canonical value size accepted by the store.
pub const MAX_VALUE_BYTES: usize = 1_048_576;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` key-value store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional value size limit; may lower [`MAX_VALUE_BYTES`], never raise it.
    #[serde(default)]
    pub max_value_bytes: Option<usize>,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with every other field at its default.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Full,
            max_value_bytes: None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Value could not be encoded to canonical text.
    #[error("sqlite store serialization error: {0}")]
    Serialization(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Storage(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Serialization(message) => Self::Serialization(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "value exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed key-value store with WAL support.
#[derive(Clone)]
pub struct SqliteKvStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// Opens an `SQLite`-backed key-value store.
    ///
    /// Creates missing parent directories and initializes the schema on first
    /// open; reopening an existing database validates its recorded schema
    /// version and fails closed on mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path or configured limits are
    /// invalid, or the database cannot be opened or initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        validate_value_limit(&config)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        info!(path = %config.path.display(), "sqlite key-value store opened");
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the effective value size limit for this store.
    #[must_use]
    const fn max_value_bytes(&self) -> usize {
        match self.config.max_value_bytes {
            Some(limit) => limit,
            None => MAX_VALUE_BYTES,
        }
    }

    /// Acquires the shared connection guard.
    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_string()))
    }

    /// Rejects canonical text larger than the effective value limit.
    fn check_value_size(&self, actual_bytes: usize) -> Result<(), SqliteStoreError> {
        let max_bytes = self.max_value_bytes();
        if actual_bytes > max_bytes {
            return Err(SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            });
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteKvStore {
    fn set(&self, key: &Key, value: &Value) -> Result<(), StoreError> {
        self.set_value(key, value).map_err(StoreError::from)
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, StoreError> {
        self.get_value(key).map_err(StoreError::from)
    }

    fn delete(&self, key: &Key) -> Result<(), StoreError> {
        self.delete_value(key).map_err(StoreError::from)
    }

    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        self.list_entries().map_err(StoreError::from)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let removed = self.clear_entries().map_err(StoreError::from)?;
        info!(entries_removed = removed, "cleared sqlite key-value store");
        Ok(())
    }

    fn batch_set(&self, entries: &[Entry]) -> Result<(), StoreError> {
        self.batch_set_entries(entries).map_err(StoreError::from)?;
        debug!(entries = entries.len(), "applied batch set");
        Ok(())
    }

    fn batch_delete(&self, keys: &[Key]) -> Result<(), StoreError> {
        self.batch_delete_keys(keys).map_err(StoreError::from)?;
        debug!(keys = keys.len(), "applied batch delete");
        Ok(())
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.check_connection().map_err(StoreError::from)
    }
}

impl SqliteKvStore {
    /// Upserts the canonical text for a key.
    fn set_value(&self, key: &Key, value: &Value) -> Result<(), SqliteStoreError> {
        let text = to_canonical_text(value)
            .map_err(|err| SqliteStoreError::Serialization(err.to_string()))?;
        self.check_value_size(text.len())?;
        let guard = self.lock_connection()?;
        guard
            .execute(
                "INSERT INTO entries (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET \
                 value = excluded.value",
                params![key.as_str(), text],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Loads and decodes the value for a key.
    fn get_value(&self, key: &Key) -> Result<Option<Value>, SqliteStoreError> {
        let text: Option<String> = {
            let guard = self.lock_connection()?;
            guard
                .query_row(
                    "SELECT value FROM entries WHERE key = ?1",
                    params![key.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        };
        let Some(text) = text else {
            return Ok(None);
        };
        let value = from_canonical_text(&text).map_err(|err| {
            SqliteStoreError::Corrupt(format!("undecodable value for key {}: {err}", key.as_str()))
        })?;
        Ok(Some(value))
    }

    /// Deletes the row for a key; absent keys are a no-op.
    fn delete_value(&self, key: &Key) -> Result<(), SqliteStoreError> {
        let guard = self.lock_connection()?;
        guard
            .execute("DELETE FROM entries WHERE key = ?1", params![key.as_str()])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Loads every row and decodes each value.
    fn list_entries(&self) -> Result<Vec<Entry>, SqliteStoreError> {
        let rows: Vec<(String, String)> = {
            let guard = self.lock_connection()?;
            let mut statement = guard
                .prepare("SELECT key, value FROM entries")
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let mapped = statement
                .query_map(params![], |row| {
                    let key: String = row.get(0)?;
                    let value: String = row.get(1)?;
                    Ok((key, value))
                })
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row.map_err(|err| SqliteStoreError::Db(err.to_string()))?);
            }
            rows
        };
        let mut entries = Vec::with_capacity(rows.len());
        for (raw_key, text) in rows {
            let key = Key::new(raw_key)
                .map_err(|err| SqliteStoreError::Corrupt(format!("invalid stored key: {err}")))?;
            let value = from_canonical_text(&text).map_err(|err| {
                SqliteStoreError::Corrupt(format!(
                    "undecodable value for key {}: {err}",
                    key.as_str()
                ))
            })?;
            entries.push(Entry::new(key, value));
        }
        Ok(entries)
    }

    /// Deletes every row and returns the removed count.
    fn clear_entries(&self) -> Result<usize, SqliteStoreError> {
        let guard = self.lock_connection()?;
        let removed = guard
            .execute("DELETE FROM entries", params![])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(removed)
    }

    /// Applies a batch of upserts inside one transaction.
    fn batch_set_entries(&self, entries: &[Entry]) -> Result<(), SqliteStoreError> {
        // Encode and size-check before taking the lock; a rejected entry must
        // not open a transaction.
        let mut prepared: Vec<(&str, String)> = Vec::with_capacity(entries.len());
        for entry in entries {
            let text = to_canonical_text(&entry.value)
                .map_err(|err| SqliteStoreError::Serialization(err.to_string()))?;
            self.check_value_size(text.len())?;
            prepared.push((entry.key.as_str(), text));
        }
        let mut guard = self.lock_connection()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        {
            let mut statement = tx
                .prepare_cached(
                    "INSERT INTO entries (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE \
                     SET value = excluded.value",
                )
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            for (key, text) in &prepared {
                statement
                    .execute(params![key, text])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            }
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Applies a batch of deletes inside one transaction.
    fn batch_delete_keys(&self, keys: &[Key]) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock_connection()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        {
            let mut statement = tx
                .prepare_cached("DELETE FROM entries WHERE key = ?1")
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            for key in keys {
                statement
                    .execute(params![key.as_str()])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            }
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }

    /// Verifies the store can execute a simple query.
    fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock_connection()?;
        let _probe: i64 = guard
            .query_row("SELECT 1", params![], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Validates the configured value limit against the hard ceiling.
fn validate_value_limit(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    let Some(limit) = config.max_value_bytes else {
        return Ok(());
    };
    if limit == 0 {
        return Err(SqliteStoreError::Invalid(
            "max_value_bytes must be greater than zero".to_string(),
        ));
    }
    if limit > MAX_VALUE_BYTES {
        return Err(SqliteStoreError::Invalid(format!(
            "max_value_bytes exceeds hard limit: {limit} bytes (max {MAX_VALUE_BYTES})"
        )));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

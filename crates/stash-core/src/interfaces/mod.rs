// crates/stash-core/src/interfaces/mod.rs
// ============================================================================
// Module: Stash Interfaces
// Description: Backend-agnostic contract for key-value store implementations.
// Purpose: Define the store trait and error taxonomy used by all backends.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The [`KeyValueStore`] trait is the single contract surface of the system.
//! Implementations map validated keys to JSON values persisted as canonical
//! text. Every fallible path returns a [`StoreError`]; failures are never
//! swallowed, and a missing key on lookup is `Ok(None)`, never an error, so
//! callers can always distinguish "operation failed" from "no value".

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::canonical::CanonicalError;
use crate::core::entry::Entry;
use crate::core::entry::Key;
use crate::core::entry::KeyError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key-value store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - A missing key is not an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Value could not be encoded to canonical text.
    #[error("key-value store serialization error: {0}")]
    Serialization(String),
    /// Store I/O error.
    #[error("key-value store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or failed to decode.
    #[error("key-value store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("key-value store version mismatch: {0}")]
    VersionMismatch(String),
    /// Input or configuration is invalid.
    #[error("key-value store invalid data: {0}")]
    Invalid(String),
    /// The persistence engine reported an error.
    #[error("key-value store engine error: {0}")]
    Storage(String),
}

impl From<KeyError> for StoreError {
    fn from(err: KeyError) -> Self {
        Self::Invalid(err.to_string())
    }
}

impl From<CanonicalError> for StoreError {
    fn from(err: CanonicalError) -> Self {
        match err {
            CanonicalError::Encode(message) => Self::Serialization(message),
            CanonicalError::Decode(message) => Self::Corrupt(message),
        }
    }
}

// ============================================================================
// SECTION: Key-Value Store
// ============================================================================

/// Durable key-value store with opaque JSON values.
///
/// Implementations must serialize values through the canonical codec, apply
/// each batch atomically (every entry lands or none do), and propagate every
/// failure; logging is never a substitute for returning an error.
pub trait KeyValueStore {
    /// Stores a value under a key, replacing any prior value.
    ///
    /// Idempotent: repeated calls with identical arguments leave identical
    /// state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or persistence fails.
    fn set(&self, key: &Key, value: &Value) -> Result<(), StoreError>;

    /// Looks up a value by exact key match.
    ///
    /// Returns `Ok(None)` when the key is absent; absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when lookup or decoding fails.
    fn get(&self, key: &Key) -> Result<Option<Value>, StoreError>;

    /// Removes the entry for a key.
    ///
    /// Removing an absent key is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete(&self, key: &Key) -> Result<(), StoreError>;

    /// Returns every entry with values deserialized.
    ///
    /// The sequence is finite and materialized; no ordering is guaranteed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when enumeration or decoding fails.
    fn list(&self) -> Result<Vec<Entry>, StoreError>;

    /// Removes all entries.
    ///
    /// No-op success on an already-empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn clear(&self) -> Result<(), StoreError>;

    /// Applies every entry in sequence order as one atomic batch.
    ///
    /// Duplicate keys within the batch resolve to the last occurrence in
    /// sequence order, matching repeated single [`KeyValueStore::set`]
    /// calls. On error, no entry of the batch is applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or persistence fails; the store
    /// is left unchanged.
    fn batch_set(&self, entries: &[Entry]) -> Result<(), StoreError>;

    /// Removes every listed key as one atomic batch.
    ///
    /// Absent keys are silently skipped; duplicate keys in the input are
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails; the store is left
    /// unchanged.
    fn batch_delete(&self, keys: &[Key]) -> Result<(), StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// crates/stash-core/src/runtime/store.rs
// ============================================================================
// Module: Stash In-Memory Store
// Description: Simple in-memory key-value store for tests and embedding.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of
//! [`KeyValueStore`] for tests and local demos. Values are held as canonical
//! text rather than live JSON structures, so the serialization contract and
//! failure surface match the durable backends exactly. It is not intended
//! for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::core::canonical::from_canonical_text;
use crate::core::canonical::to_canonical_text;
use crate::core::entry::Entry;
use crate::core::entry::Key;
use crate::interfaces::KeyValueStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory key-value store for tests and examples.
///
/// Cloning shares the underlying map.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    /// Entry map from key to canonical value text, protected by a mutex.
    entries: Arc<Mutex<BTreeMap<Key, String>>>,
}

impl MemoryKvStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Locks the entry map, mapping a poisoned mutex to a store error.
    fn lock_entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Key, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Storage("key-value store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKvStore {
    fn set(&self, key: &Key, value: &Value) -> Result<(), StoreError> {
        let text = to_canonical_text(value)?;
        self.lock_entries()?.insert(key.clone(), text);
        Ok(())
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, StoreError> {
        let guard = self.lock_entries()?;
        guard.get(key).map(|text| from_canonical_text(text).map_err(StoreError::from)).transpose()
    }

    fn delete(&self, key: &Key) -> Result<(), StoreError> {
        self.lock_entries()?.remove(key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        let guard = self.lock_entries()?;
        guard
            .iter()
            .map(|(key, text)| {
                let value = from_canonical_text(text)?;
                Ok(Entry::new(key.clone(), value))
            })
            .collect()
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock_entries()?.clear();
        Ok(())
    }

    fn batch_set(&self, entries: &[Entry]) -> Result<(), StoreError> {
        // Encode everything up front so a failing entry leaves the map untouched.
        let mut encoded = Vec::with_capacity(entries.len());
        for entry in entries {
            let text = to_canonical_text(&entry.value)?;
            encoded.push((entry.key.clone(), text));
        }
        let mut guard = self.lock_entries()?;
        for (key, text) in encoded {
            guard.insert(key, text);
        }
        drop(guard);
        Ok(())
    }

    fn batch_delete(&self, keys: &[Key]) -> Result<(), StoreError> {
        let mut guard = self.lock_entries()?;
        for key in keys {
            guard.remove(key);
        }
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared key-value store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedKvStore {
    /// Inner store implementation.
    inner: Arc<dyn KeyValueStore + Send + Sync>,
}

impl SharedKvStore {
    /// Wraps a key-value store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl KeyValueStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl KeyValueStore for SharedKvStore {
    fn set(&self, key: &Key, value: &Value) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, StoreError> {
        self.inner.get(key)
    }

    fn delete(&self, key: &Key) -> Result<(), StoreError> {
        self.inner.delete(key)
    }

    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        self.inner.list()
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear()
    }

    fn batch_set(&self, entries: &[Entry]) -> Result<(), StoreError> {
        self.inner.batch_set(entries)
    }

    fn batch_delete(&self, keys: &[Key]) -> Result<(), StoreError> {
        self.inner.batch_delete(keys)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}

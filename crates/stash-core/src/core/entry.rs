// crates/stash-core/src/core/entry.rs
// ============================================================================
// Module: Stash Entry Model
// Description: Validated store keys and the key/value entry pair.
// Purpose: Enforce key invariants at construction so backends never re-check.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module defines the sole entity of the store: an [`Entry`] pairing a
//! validated [`Key`] with an arbitrary JSON value. Keys are opaque UTF-8
//! strings validated once at the construction boundary; every accepted
//! [`Key`] is non-empty and within the byte cap, so backends can treat keys
//! as trusted primary-key material.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted key length in bytes.
pub const MAX_KEY_BYTES: usize = 4096;

// ============================================================================
// SECTION: Key Type
// ============================================================================

/// Errors raised by [`Key`] construction.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Key is the empty string.
    #[error("key must not be empty")]
    Empty,
    /// Key exceeds the byte cap.
    #[error("key exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLong {
        /// Maximum allowed key size in bytes.
        max_bytes: usize,
        /// Actual key size in bytes.
        actual_bytes: usize,
    },
}

/// Store key acting as the primary key of an entry.
///
/// # Invariants
/// - Non-empty UTF-8 string.
/// - At most [`MAX_KEY_BYTES`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Key(String);

impl Key {
    /// Creates a new key after validating the invariants.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the key is empty or exceeds
    /// [`MAX_KEY_BYTES`].
    pub fn new(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        if key.len() > MAX_KEY_BYTES {
            return Err(KeyError::TooLong {
                max_bytes: MAX_KEY_BYTES,
                actual_bytes: key.len(),
            });
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Key {
    type Error = KeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Entry Type
// ============================================================================

/// One key/value pair persisted in the store.
///
/// # Invariants
/// - Exactly one entry exists per key at any time (insert-or-replace).
/// - The value is any JSON structure; it is stored as canonical text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Primary key of the entry.
    pub key: Key,
    /// JSON value associated with the key.
    pub value: Value,
}

impl Entry {
    /// Creates a new entry from a validated key and a value.
    #[must_use]
    pub const fn new(key: Key, value: Value) -> Self {
        Self {
            key,
            value,
        }
    }
}

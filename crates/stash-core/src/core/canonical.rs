// crates/stash-core/src/core/canonical.rs
// ============================================================================
// Module: Stash Canonical JSON Codec
// Description: Deterministic text encoding for stored JSON values.
// Purpose: Define the reversible on-disk value format shared by all backends.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! The store persists every value as canonical JSON text. The encoding is
//! `serde_json`'s deterministic rendering of [`Value`]: object keys serialize
//! in lexicographic order (the default `BTreeMap` object representation),
//! integers exactly, and floats via shortest round-trip formatting.
//! Structurally equal values therefore always produce byte-identical text,
//! and decoding that text reconstructs a structurally equal value.
//!
//! RFC 8785 (JCS) is deliberately not used here: JCS number formatting
//! renders `1.0` as `1`, which turns a float into an integer across a round
//! trip and breaks the store's exactness guarantee.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the canonical JSON codec.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Value could not be encoded to canonical text.
    #[error("failed to encode canonical json: {0}")]
    Encode(String),
    /// Text could not be decoded as canonical JSON.
    #[error("failed to decode canonical json: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Encodes a JSON value to its canonical text form.
///
/// # Errors
///
/// Returns [`CanonicalError::Encode`] when serialization fails.
pub fn to_canonical_text(value: &Value) -> Result<String, CanonicalError> {
    serde_json::to_string(value).map_err(|err| CanonicalError::Encode(err.to_string()))
}

/// Decodes canonical text back into a JSON value.
///
/// Text not produced by [`to_canonical_text`] is rejected; the store treats
/// such rows as corrupt.
///
/// # Errors
///
/// Returns [`CanonicalError::Decode`] when the text is not valid JSON.
pub fn from_canonical_text(text: &str) -> Result<Value, CanonicalError> {
    serde_json::from_str(text).map_err(|err| CanonicalError::Decode(err.to_string()))
}

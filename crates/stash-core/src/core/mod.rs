// crates/stash-core/src/core/mod.rs
// ============================================================================
// Module: Stash Core Domain
// Description: Domain types and the canonical serialization codec.
// Purpose: Group the entry model and canonical JSON helpers.
// Dependencies: crate modules only
// ============================================================================

//! ## Overview
//! Core domain surface: validated keys, the entry pair type, and the
//! canonical JSON text codec that defines the store's on-disk value format.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod canonical;
pub mod entry;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use entry::Entry;
pub use entry::Key;
pub use entry::KeyError;
pub use entry::MAX_KEY_BYTES;

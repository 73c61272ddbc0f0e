// crates/stash-core/src/lib.rs
// ============================================================================
// Module: Stash Core Library
// Description: Domain types and contract surfaces for the Stash key-value store.
// Purpose: Re-export the public API from the core, interfaces, and runtime modules.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Stash is a durable key-value store with opaque JSON values. This crate
//! holds everything backend-neutral: the validated [`Key`] type, the
//! [`Entry`] pair, the canonical JSON codec, the [`KeyValueStore`] contract
//! with its [`StoreError`] taxonomy, and an in-memory backend for tests and
//! embedding. Durable backends live in sibling crates and implement
//! [`KeyValueStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::canonical;
pub use crate::core::entry::Entry;
pub use crate::core::entry::Key;
pub use crate::core::entry::KeyError;
pub use crate::core::entry::MAX_KEY_BYTES;
pub use crate::interfaces::KeyValueStore;
pub use crate::interfaces::StoreError;
pub use crate::runtime::store::MemoryKvStore;
pub use crate::runtime::store::SharedKvStore;

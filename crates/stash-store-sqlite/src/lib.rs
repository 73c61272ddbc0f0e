// crates/stash-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Key-Value Store
// Description: Durable KeyValueStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for stash entries.
// Dependencies: stash-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed implementation of
//! [`KeyValueStore`](stash_core::KeyValueStore) that persists canonical JSON
//! text in a single keyed table. It is designed for deterministic
//! serialization, atomic batches, and crash-safe durability through WAL.
//! Security posture: database contents are untrusted; every row read back is
//! decoded through the canonical codec and corruption fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_VALUE_BYTES;
pub use store::SqliteKvStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;

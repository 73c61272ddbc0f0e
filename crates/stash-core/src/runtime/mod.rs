// crates/stash-core/src/runtime/mod.rs
// ============================================================================
// Module: Stash Runtime
// Description: Backend implementations shipped with the core crate.
// Purpose: Group the in-memory store and the shared store wrapper.
// Dependencies: crate modules only
// ============================================================================

//! ## Overview
//! Runtime pieces that are useful without a durable backend: the in-memory
//! [`store::MemoryKvStore`] and the clonable [`store::SharedKvStore`] handle.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use store::MemoryKvStore;
pub use store::SharedKvStore;

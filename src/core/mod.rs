//! In-memory queue store.

/// Volatile implementation of the queue store contract.
pub mod queue;

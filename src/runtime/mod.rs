//! Execution contexts that trigger replay, and the channels between them.

/// Shared pass runner and runtime errors.
pub mod context;
/// Event stream types emitted by the contexts.
pub mod events;
/// Cross-context messages and the background-sync registry.
pub mod notifier;
/// Page execution context.
pub mod page;
/// Service worker execution context.
pub mod worker;

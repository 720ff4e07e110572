//! Task domain model.
//!
//! # Responsibility
//! - Define canonical task data structures used by core business logic.
//! - Keep lifecycle transitions pure (no I/O); callers pass `now` in.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard delete owned by the store, not a model state.

pub mod request;
pub mod task;
pub mod time_remaining;

//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task store contract consumed by lifecycle services.
//! - Isolate SQLite query details from service/dispatch orchestration.
//!
//! # Invariants
//! - Store writes must enforce `Task::validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_repo;

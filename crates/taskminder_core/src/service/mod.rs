//! Use-case services over the task store.

pub mod stats;
pub mod task_service;

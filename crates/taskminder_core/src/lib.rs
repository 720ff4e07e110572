//! Core domain logic for Taskminder.
//! This crate is the single source of truth for task lifecycle invariants and
//! reminder dispatch behavior.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LoggingConfig, ReminderConfig, TaskminderConfig};
pub use logging::{
    default_log_level, init_from_config, init_logging, init_stderr_logging, logging_status,
    LoggingError,
};
pub use model::request::{FieldChanges, NewTask, TaskPatch};
pub use model::task::{
    Category, EpochMillis, Priority, Task, TaskId, TaskStatus, TaskValidationError,
};
pub use model::time_remaining::TimeRemaining;
pub use reminder::coordinator::{
    AckResponse, Acknowledgement, BackgroundDispatch, DispatchError, DispatchOutcome,
    DispatchResult, ReminderCoordinator,
};
pub use reminder::digest::ReminderDigest;
pub use reminder::schedule::{spawn_daily_trigger, DailySchedule, ScheduleError};
pub use reminder::transport::{LogTransport, MessageTransport, OutboundMessage, TransportError};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskStore, TaskListQuery, TaskStore};
pub use service::stats::{BoardStats, CategoryCounts, MonthlyStats};
pub use service::task_service::{ServiceResult, TaskService, TaskServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Classifies the time left until `task`'s deadline at `now`.
pub fn time_remaining(task: &Task, now: EpochMillis) -> TimeRemaining {
    task.time_remaining(now)
}

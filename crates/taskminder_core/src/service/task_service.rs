//! Task lifecycle use-case service.
//!
//! # Responsibility
//! - Validate boundary input and apply lifecycle transitions through a store.
//! - Assign every server-side timestamp from the injected clock.
//!
//! # Invariants
//! - Status is always `todo` on create, whatever the caller sent.
//! - Input is validated before any store access; a rejected or missing task
//!   never produces a store write.
//! - Each status change or field update is one `TaskStore::modify_task`
//!   step, so concurrent callers never lose each other's changes.
//! - Service layer remains storage-agnostic.

use crate::clock::Clock;
use crate::model::request::{NewTask, TaskPatch};
use crate::model::task::{Category, Priority, Task, TaskId, TaskStatus, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskListQuery, TaskStore};
use crate::service::stats::{BoardStats, MonthlyStats};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ServiceResult<T> = Result<T, TaskServiceError>;

/// Service error for task lifecycle use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Malformed input (bad enum value, empty description, ...).
    Validation(TaskValidationError),
    /// No task has the referenced id.
    NotFound(TaskId),
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Store(err) => write!(f, "task store failure: {err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

/// Use-case service wrapper for task lifecycle operations.
pub struct TaskService<S: TaskStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: TaskStore> TaskService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Creates a `todo` task from boundary input.
    ///
    /// # Errors
    /// - `Validation` for an empty description or unknown category/priority.
    pub fn create(&self, input: &NewTask) -> ServiceResult<Task> {
        let category = input.category.parse::<Category>()?;
        let priority = input.priority.parse::<Priority>()?;
        let task = Task::new(
            input.description.clone(),
            category,
            priority,
            input.deadline,
            self.clock.now_ms(),
        )?;

        self.store.insert_task(&task)?;
        info!(
            "event=task_create module=service status=ok task_id={} category={} priority={}",
            task.id, task.category, task.priority
        );
        Ok(task)
    }

    pub fn get(&self, id: TaskId) -> ServiceResult<Task> {
        self.store.get_task(id)?.ok_or(TaskServiceError::NotFound(id))
    }

    /// Sets status from a raw value (`todo|in-progress|done`).
    ///
    /// The value is parsed before the store is touched.
    pub fn set_status(&self, id: TaskId, status: &str) -> ServiceResult<Task> {
        let status = status.parse::<TaskStatus>()?;
        self.transition(id, status)
    }

    /// Sets any of the three statuses; writing the current status again
    /// still refreshes `updated_at`.
    pub fn transition(&self, id: TaskId, status: TaskStatus) -> ServiceResult<Task> {
        let mut from = status;
        let task = self.store.modify_task(id, |task| {
            from = task.status;
            task.set_status(status, self.clock.now_ms());
            Ok(())
        })?;
        info!(
            "event=task_status module=service status=ok task_id={} from={} to={}",
            id, from, status
        );
        Ok(task)
    }

    /// Moves a task one step along `todo -> in-progress -> done`.
    ///
    /// The current status is read and replaced in one store step.
    ///
    /// # Errors
    /// - `Validation(AlreadyDone)` when the task is already done.
    pub fn advance(&self, id: TaskId) -> ServiceResult<Task> {
        let mut from = TaskStatus::Todo;
        let task = self.store.modify_task(id, |task| {
            from = task.status;
            let next = task.status.next().ok_or(TaskValidationError::AlreadyDone(id))?;
            task.set_status(next, self.clock.now_ms());
            Ok(())
        })?;
        info!(
            "event=task_status module=service status=ok task_id={} from={} to={}",
            id, from, task.status
        );
        Ok(task)
    }

    /// Applies a partial update; absent fields are left untouched.
    pub fn update_fields(&self, id: TaskId, patch: &TaskPatch) -> ServiceResult<Task> {
        let changes = patch.validate()?;
        let task = self.store.modify_task(id, |task| {
            task.apply_changes(&changes, self.clock.now_ms());
            Ok(())
        })?;
        info!("event=task_update module=service status=ok task_id={id}");
        Ok(task)
    }

    pub fn delete(&self, id: TaskId) -> ServiceResult<()> {
        self.store.delete_task(id)?;
        info!("event=task_delete module=service status=ok task_id={id}");
        Ok(())
    }

    pub fn list(&self, query: &TaskListQuery) -> ServiceResult<Vec<Task>> {
        Ok(self.store.list_tasks(query)?)
    }

    pub fn list_by_status(&self, statuses: &[TaskStatus]) -> ServiceResult<Vec<Task>> {
        self.list(&TaskListQuery::by_status(statuses))
    }

    /// Unresolved tasks (`todo` or `in-progress`), in store order.
    pub fn pending(&self) -> ServiceResult<Vec<Task>> {
        self.list_by_status(&TaskStatus::PENDING)
    }

    /// Completion counts for the calendar month (UTC) containing now.
    pub fn monthly_stats(&self) -> ServiceResult<MonthlyStats> {
        let tasks = self.list(&TaskListQuery::default())?;
        Ok(MonthlyStats::compute(&tasks, self.clock.now_ms()))
    }

    pub fn board_stats(&self) -> ServiceResult<BoardStats> {
        let tasks = self.list(&TaskListQuery::default())?;
        Ok(BoardStats::compute(&tasks))
    }
}

//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its closed enumerations.
//! - Apply lifecycle transitions (status change, field update) in memory.
//!
//! # Invariants
//! - `id` is stable, never nil, and never reused for another task.
//! - `description` is non-empty after trimming.
//! - `updated_at >= created_at`, and every mutation strictly advances
//!   `updated_at`.
//! - A freshly created task is always `TaskStatus::Todo`.
//! - Enum values parse from their exact wire spelling only.

use crate::model::request::FieldChanges;
use crate::model::time_remaining::TimeRemaining;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Unix epoch milliseconds.
pub type EpochMillis = i64;

/// Fixed category set a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Personal,
    Work,
    Fitness,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Personal, Category::Work, Category::Fitness];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Work => "Work",
            Self::Fitness => "Fitness",
        }
    }
}

impl FromStr for Category {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| TaskValidationError::UnknownCategory(value.to_string()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == value)
            .ok_or_else(|| TaskValidationError::UnknownPriority(value.to_string()))
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle state.
///
/// Any state may be set explicitly; the one-directional
/// `todo -> in-progress -> done` flow is exposed separately via [`TaskStatus::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Created but not started.
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed.
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// Statuses that count as unresolved for reminders.
    pub const PENDING: [TaskStatus; 2] = [TaskStatus::Todo, TaskStatus::InProgress];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }

    /// Next state in the advance flow, `None` once done.
    pub fn next(self) -> Option<TaskStatus> {
        match self {
            Self::Todo => Some(Self::InProgress),
            Self::InProgress => Some(Self::Done),
            Self::Done => None,
        }
    }

    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Done)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| TaskValidationError::UnknownStatus(value.to_string()))
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for task input and task state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilId,
    EmptyDescription,
    UnknownCategory(String),
    UnknownPriority(String),
    UnknownStatus(String),
    UpdatedBeforeCreated {
        created_at: EpochMillis,
        updated_at: EpochMillis,
    },
    /// The advance flow has no state after `done`.
    AlreadyDone(TaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "task id must not be nil"),
            Self::EmptyDescription => write!(f, "description must not be empty"),
            Self::UnknownCategory(value) => write!(
                f,
                "unknown category `{value}`; expected Personal|Work|Fitness"
            ),
            Self::UnknownPriority(value) => {
                write!(f, "unknown priority `{value}`; expected low|medium|high")
            }
            Self::UnknownStatus(value) => write!(
                f,
                "unknown status `{value}`; expected todo|in-progress|done"
            ),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at ({updated_at}) must be >= created_at ({created_at})"
            ),
            Self::AlreadyDone(id) => write!(f, "task {id} is already done"),
        }
    }
}

impl Error for TaskValidationError {}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskWire")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Unix epoch milliseconds; `None` means no deadline.
    pub deadline: Option<EpochMillis>,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

#[derive(Deserialize)]
struct TaskWire {
    id: TaskId,
    description: String,
    category: Category,
    priority: Priority,
    status: TaskStatus,
    deadline: Option<EpochMillis>,
    created_at: EpochMillis,
    updated_at: EpochMillis,
}

impl TryFrom<TaskWire> for Task {
    type Error = TaskValidationError;

    fn try_from(value: TaskWire) -> Result<Self, Self::Error> {
        let task = Task {
            id: value.id,
            description: value.description,
            category: value.category,
            priority: value.priority,
            status: value.status,
            deadline: value.deadline,
            created_at: value.created_at,
            updated_at: value.updated_at,
        };
        task.validate()?;
        Ok(task)
    }
}

impl Task {
    /// Creates a new `todo` task with a generated id.
    ///
    /// # Errors
    /// - `EmptyDescription` when `description` is blank.
    pub fn new(
        description: impl Into<String>,
        category: Category,
        priority: Priority,
        deadline: Option<EpochMillis>,
        now: EpochMillis,
    ) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), description, category, priority, deadline, now)
    }

    /// Creates a new `todo` task with a caller-provided id.
    ///
    /// Used by import paths and tests that need a fixed identity.
    pub fn with_id(
        id: TaskId,
        description: impl Into<String>,
        category: Category,
        priority: Priority,
        deadline: Option<EpochMillis>,
        now: EpochMillis,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            description: normalize_description(description.into())?,
            category,
            priority,
            status: TaskStatus::Todo,
            deadline,
            created_at: now,
            updated_at: now,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.description.trim().is_empty() {
            return Err(TaskValidationError::EmptyDescription);
        }
        if self.updated_at < self.created_at {
            return Err(TaskValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Sets `status` and refreshes `updated_at`, even when unchanged.
    pub fn set_status(&mut self, status: TaskStatus, now: EpochMillis) {
        self.status = status;
        self.touch(now);
    }

    /// Applies already-validated field changes and refreshes `updated_at`.
    pub fn apply_changes(&mut self, changes: &FieldChanges, now: EpochMillis) {
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(deadline) = changes.deadline {
            self.deadline = deadline;
        }
        self.touch(now);
    }

    /// Advances `updated_at` to `now`, or by one millisecond when the clock
    /// has not moved past the previous value.
    pub fn touch(&mut self, now: EpochMillis) {
        self.updated_at = now.max(self.updated_at.saturating_add(1));
    }

    pub fn time_remaining(&self, now: EpochMillis) -> TimeRemaining {
        TimeRemaining::compute(self.deadline, now)
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

pub(crate) fn normalize_description(value: String) -> Result<String, TaskValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyDescription);
    }
    if trimmed.len() == value.len() {
        return Ok(value);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Category, Priority, Task, TaskStatus, TaskValidationError};

    #[test]
    fn new_task_starts_in_todo_with_equal_timestamps() {
        let task = Task::new("write report", Category::Work, Priority::High, None, 1_000).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, 1_000);
        assert_eq!(task.updated_at, 1_000);
    }

    #[test]
    fn new_task_trims_and_rejects_blank_description() {
        let task = Task::new("  stretch  ", Category::Fitness, Priority::Low, None, 0).unwrap();
        assert_eq!(task.description, "stretch");

        let err = Task::new("   ", Category::Fitness, Priority::Low, None, 0).unwrap_err();
        assert_eq!(err, TaskValidationError::EmptyDescription);
    }

    #[test]
    fn touch_advances_even_when_clock_is_behind() {
        let mut task = Task::new("a", Category::Personal, Priority::Low, None, 5_000).unwrap();
        task.touch(5_000);
        assert_eq!(task.updated_at, 5_001);
        task.touch(4_000);
        assert_eq!(task.updated_at, 5_002);
        task.touch(9_000);
        assert_eq!(task.updated_at, 9_000);
    }

    #[test]
    fn status_parsing_accepts_only_known_values() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!(matches!(
            "in_progress".parse::<TaskStatus>(),
            Err(TaskValidationError::UnknownStatus(_))
        ));
        assert!(matches!(
            "archived".parse::<TaskStatus>(),
            Err(TaskValidationError::UnknownStatus(_))
        ));
    }

    #[test]
    fn enum_parsing_rejects_padded_and_miscased_values() {
        assert_eq!(
            " done ".parse::<TaskStatus>(),
            Err(TaskValidationError::UnknownStatus(" done ".to_string()))
        );
        assert!(matches!(
            "Done".parse::<TaskStatus>(),
            Err(TaskValidationError::UnknownStatus(_))
        ));
        assert!(matches!(
            "work".parse::<Category>(),
            Err(TaskValidationError::UnknownCategory(_))
        ));
        assert!(matches!(
            "Work ".parse::<Category>(),
            Err(TaskValidationError::UnknownCategory(_))
        ));
        assert!(matches!(
            " high".parse::<Priority>(),
            Err(TaskValidationError::UnknownPriority(_))
        ));

        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        for priority in Priority::ALL {
            assert_eq!(priority.as_str().parse::<Priority>(), Ok(priority));
        }
    }

    #[test]
    fn advance_flow_ends_at_done() {
        assert_eq!(TaskStatus::Todo.next(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::InProgress.next(), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::Done.next(), None);
    }
}

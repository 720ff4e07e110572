//! Boundary input shapes for task create/update use-cases.
//!
//! # Responsibility
//! - Accept loosely typed caller input (as an HTTP or CLI adapter would
//!   deserialize it).
//! - Convert it into closed enum values, rejecting anything outside the sets.
//!
//! # Invariants
//! - A caller-supplied `status` on create is accepted on the wire but never
//!   applied.
//! - Patch fields left as `None` are not touched; `deadline: Some(None)`
//!   clears the deadline.

use crate::model::task::{
    normalize_description, Category, EpochMillis, Priority, TaskValidationError,
};
use serde::{Deserialize, Deserializer};

/// Create-task input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewTask {
    pub description: String,
    pub category: String,
    pub priority: String,
    #[serde(default)]
    pub deadline: Option<EpochMillis>,
    /// Ignored; new tasks always start as `todo`.
    #[serde(default)]
    pub status: Option<String>,
}

impl NewTask {
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
            priority: priority.into(),
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: EpochMillis) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Partial update input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// `None`: untouched. `Some(None)`: cleared. `Some(Some(ms))`: set.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub deadline: Option<Option<EpochMillis>>,
}

/// Validated form of [`TaskPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldChanges {
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub deadline: Option<Option<EpochMillis>>,
}

impl TaskPatch {
    /// Parses every present field, failing on the first invalid one.
    pub fn validate(&self) -> Result<FieldChanges, TaskValidationError> {
        let description = self
            .description
            .clone()
            .map(normalize_description)
            .transpose()?;
        let category = self
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?;
        let priority = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?;

        Ok(FieldChanges {
            description,
            category,
            priority,
            deadline: self.deadline,
        })
    }
}

// Why: plain `Option<Option<T>>` collapses an explicit `null` into "absent";
// a present field must map to `Some(..)` so that `null` means "clear".
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<EpochMillis>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<EpochMillis>::deserialize(deserializer).map(Some)
}

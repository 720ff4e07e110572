//! Derived deadline view state.

use crate::model::task::EpochMillis;
use std::time::Duration;

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Time left until a task deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    /// Deadline is strictly in the future.
    Remaining(Duration),
    /// Deadline is at or before `now`.
    Overdue,
    NoDeadline,
}

impl TimeRemaining {
    /// Classifies `deadline` against `now`; `deadline == now` is overdue.
    pub fn compute(deadline: Option<EpochMillis>, now: EpochMillis) -> Self {
        match deadline {
            None => Self::NoDeadline,
            Some(deadline) if deadline <= now => Self::Overdue,
            Some(deadline) => {
                let diff = deadline.abs_diff(now);
                Self::Remaining(Duration::from_millis(diff))
            }
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, Self::Overdue)
    }

    /// Short human label, `None` when there is no deadline.
    ///
    /// Days and hours when at least a day is left, hours and minutes when at
    /// least an hour is left, minutes otherwise.
    pub fn label(&self) -> Option<String> {
        match self {
            Self::NoDeadline => None,
            Self::Overdue => Some("Overdue".to_string()),
            Self::Remaining(duration) => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                let days = ms / DAY_MS;
                let hours = (ms % DAY_MS) / HOUR_MS;
                let minutes = (ms % HOUR_MS) / MINUTE_MS;
                let label = if days > 0 {
                    format!("{days}d {hours}h")
                } else if hours > 0 {
                    format!("{hours}h {minutes}m")
                } else {
                    format!("{minutes}m")
                };
                Some(label)
            }
        }
    }
}

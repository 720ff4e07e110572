//! Aggregate task counters for dashboards and reports.
//!
//! # Invariants
//! - Month membership uses `updated_at` in the UTC calendar month of `now`.
//! - Per-category counts only include `done` tasks.

use crate::model::task::{Category, EpochMillis, Task, TaskStatus};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Completed-task counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryCounts {
    pub personal: usize,
    pub work: usize,
    pub fitness: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Personal => self.personal,
            Category::Work => self.work,
            Category::Fitness => self.fitness,
        }
    }

    fn bump(&mut self, category: Category) {
        match category {
            Category::Personal => self.personal += 1,
            Category::Work => self.work += 1,
            Category::Fitness => self.fitness += 1,
        }
    }
}

/// Activity in the current calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthlyStats {
    /// Tasks touched this month.
    pub total: usize,
    /// Of those, tasks in `done`.
    pub completed: usize,
    pub by_category: CategoryCounts,
}

impl MonthlyStats {
    pub fn compute(tasks: &[Task], now: EpochMillis) -> Self {
        let Some(current) = month_of(now) else {
            return Self::default();
        };

        let mut stats = Self::default();
        for task in tasks
            .iter()
            .filter(|task| month_of(task.updated_at) == Some(current))
        {
            stats.total += 1;
            if task.status == TaskStatus::Done {
                stats.completed += 1;
                stats.by_category.bump(task.category);
            }
        }
        stats
    }
}

/// Whole-board progress counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub in_progress: usize,
    pub done: usize,
    /// `done / total` as a rounded percentage; `0` on an empty board.
    pub progress_percent: u8,
}

impl BoardStats {
    pub fn compute(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let in_progress = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::InProgress)
            .count();
        let done = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Done)
            .count();
        let percent = (done as f64 * 100.0 / total.max(1) as f64).round();

        Self {
            total,
            in_progress,
            done,
            progress_percent: percent.clamp(0.0, 100.0) as u8,
        }
    }
}

fn month_of(ms: EpochMillis) -> Option<(i32, u32)> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|at| (at.year(), at.month()))
}

//! Reminder digest composition.
//!
//! # Invariants
//! - A digest is built fresh from one snapshot and never reused.
//! - Subject and body depend only on the snapshot contents and order, so the
//!   same snapshot always yields the same text.

use crate::model::task::{EpochMillis, Task};
use crate::reminder::transport::OutboundMessage;

/// Point-in-time view of unresolved tasks for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDigest {
    tasks: Vec<Task>,
    generated_at: EpochMillis,
}

impl ReminderDigest {
    /// Keeps only pending tasks, preserving snapshot order.
    pub fn new(snapshot: Vec<Task>, generated_at: EpochMillis) -> Self {
        let tasks = snapshot.into_iter().filter(Task::is_pending).collect();
        Self {
            tasks,
            generated_at,
        }
    }

    pub fn generated_at(&self) -> EpochMillis {
        self.generated_at
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn subject(&self) -> String {
        match self.tasks.len() {
            1 => "Task Reminder - 1 task pending".to_string(),
            count => format!("Task Reminder - {count} tasks pending"),
        }
    }

    /// One line per task, in snapshot order.
    pub fn body(&self) -> String {
        let mut body = String::from("Here are your pending tasks:\n\n");
        for task in &self.tasks {
            body.push_str(&format!(
                "- {} ({} - {} priority)\n",
                task.description, task.category, task.priority
            ));
        }
        body.push_str(&format!(
            "\nTotal pending tasks: {}\n\nDon't forget to complete them!\n",
            self.tasks.len()
        ));
        body
    }

    pub fn to_message(&self, sender: &str, recipient: &str) -> OutboundMessage {
        OutboundMessage {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            subject: self.subject(),
            body: self.body(),
        }
    }
}

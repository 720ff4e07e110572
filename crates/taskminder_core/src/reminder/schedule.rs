//! Daily clock trigger.
//!
//! # Responsibility
//! - Parse a `HH:MM` (UTC) time of day.
//! - Run a background loop that fires the async reminder trigger once per day.
//!
//! # Invariants
//! - `next_fire_after(now)` is strictly after `now`.
//! - The loop waits for one dispatch to finish before scheduling the next.

use crate::model::task::EpochMillis;
use crate::reminder::coordinator::ReminderCoordinator;
use crate::reminder::transport::MessageTransport;
use crate::repo::task_repo::TaskStore;
use chrono::{DateTime, TimeDelta, Utc};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;

static DAILY_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid daily_at regex"));

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleError(String);

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected HH:MM (00:00-23:59), got `{}`", self.0)
    }
}

impl Error for ScheduleError {}

/// Time of day (UTC) at which the reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    hour: u32,
    minute: u32,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Next fire instant strictly after `now`.
    pub fn next_fire_after(&self, now: EpochMillis) -> EpochMillis {
        let Some(now_at) = DateTime::<Utc>::from_timestamp_millis(now) else {
            return now.saturating_add(DAY_MS);
        };
        let Some(today) = now_at.date_naive().and_hms_opt(self.hour, self.minute, 0) else {
            return now.saturating_add(DAY_MS);
        };

        let candidate = today.and_utc();
        if candidate.timestamp_millis() > now {
            return candidate.timestamp_millis();
        }
        (candidate + TimeDelta::days(1)).timestamp_millis()
    }
}

impl FromStr for DailySchedule {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let captures = DAILY_AT_RE
            .captures(trimmed)
            .ok_or_else(|| ScheduleError(trimmed.to_string()))?;
        let hour = captures[1]
            .parse()
            .map_err(|_| ScheduleError(trimmed.to_string()))?;
        let minute = captures[2]
            .parse()
            .map_err(|_| ScheduleError(trimmed.to_string()))?;
        Self::new(hour, minute)
    }
}

impl Display for DailySchedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Spawns the daily trigger loop on the current Tokio runtime.
///
/// The loop never ends on its own; abort the returned handle to stop it.
/// Duplicate suppression is left to this loop being the only clock source.
pub fn spawn_daily_trigger<S, T>(
    coordinator: ReminderCoordinator<S, T>,
    schedule: DailySchedule,
    token: String,
) -> JoinHandle<()>
where
    S: TaskStore + 'static,
    T: MessageTransport + 'static,
{
    tokio::spawn(async move {
        info!("event=daily_trigger module=schedule status=start daily_at={schedule}");
        loop {
            let now = coordinator.now_ms();
            let next = schedule.next_fire_after(now);
            let wait_ms = u64::try_from(next.saturating_sub(now)).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;

            match coordinator.trigger_async(&token) {
                Ok(ack) => {
                    info!(
                        "event=daily_trigger module=schedule status=fired accepted_at={}",
                        ack.accepted_at()
                    );
                    if let Err(err) = ack.release().await {
                        error!(
                            "event=daily_trigger module=schedule status=error error_code=background_join_failed error={err}"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        "event=daily_trigger module=schedule status=rejected error={err}"
                    );
                }
            }
        }
    })
}

//! Reminder dispatch coordinator.
//!
//! # Responsibility
//! - Gate every trigger on the configured shared secret.
//! - Snapshot pending tasks, compose a digest, and hand it to the transport.
//! - Offer an async calling convention (acknowledge now, deliver later) and a
//!   sync one (deliver, then report).
//!
//! # Invariants
//! - A rejected token causes no store read and no send attempt.
//! - Each accepted trigger takes exactly one snapshot and makes at most one
//!   send attempt; triggers are not deduplicated against each other.
//! - On the async path the background unit starts only after the
//!   acknowledgment is released, and its outcome is only logged.
//! - No lock is held while composing or sending.

use crate::config::ReminderConfig;
use crate::model::task::EpochMillis;
use crate::reminder::digest::ReminderDigest;
use crate::reminder::transport::{MessageTransport, OutboundMessage, TransportError};
use crate::repo::task_repo::TaskStore;
use crate::service::task_service::{TaskService, TaskServiceError};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const PROBE_SUBJECT: &str = "Test Email - Task Reminder";
const PROBE_BODY: &str = "If you see this, reminder delivery is working!\n";

/// Failures that prevent a dispatch from producing an outcome.
///
/// Transport failures are not errors here; they are reported inside
/// [`DispatchResult`] (sync) or logged (async).
#[derive(Debug)]
pub enum DispatchError {
    /// Token did not match the configured secret.
    Unauthorized,
    /// The async path was invoked outside a Tokio runtime.
    NoRuntime,
    /// Reading the pending-task snapshot failed.
    Snapshot(TaskServiceError),
    /// The blocking snapshot worker panicked or was cancelled.
    Worker(String),
}

impl DispatchError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized trigger"),
            Self::NoRuntime => write!(f, "async trigger requires a running Tokio runtime"),
            Self::Snapshot(err) => write!(f, "pending task snapshot failed: {err}"),
            Self::Worker(message) => write!(f, "snapshot worker failed: {message}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskServiceError> for DispatchError {
    fn from(value: TaskServiceError) -> Self {
        Self::Snapshot(value)
    }
}

/// What one dispatch sequence did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Snapshot was empty; the transport was not called.
    NothingToSend,
    Sent { task_count: usize },
    DeliveryFailed { task_count: usize, reason: String },
}

impl DispatchOutcome {
    fn from_send(task_count: usize, sent: Result<(), TransportError>) -> Self {
        match sent {
            Ok(()) => Self::Sent { task_count },
            Err(err) => Self::DeliveryFailed {
                task_count,
                reason: err.to_string(),
            },
        }
    }
}

/// Result object returned by the sync trigger and the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub sent: bool,
    pub task_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DispatchOutcome> for DispatchResult {
    fn from(value: DispatchOutcome) -> Self {
        match value {
            DispatchOutcome::NothingToSend => Self {
                sent: false,
                task_count: 0,
                error: None,
            },
            DispatchOutcome::Sent { task_count } => Self {
                sent: true,
                task_count,
                error: None,
            },
            DispatchOutcome::DeliveryFailed { task_count, reason } => Self {
                sent: false,
                task_count,
                error: Some(reason),
            },
        }
    }
}

/// Wire shape of an async acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AckResponse {
    pub accepted: bool,
    pub accepted_at: EpochMillis,
}

pub type BackgroundDispatch = JoinHandle<Result<DispatchOutcome, DispatchError>>;

/// Acknowledgment for an accepted async trigger.
///
/// The background dispatch waits until this value is released (or dropped),
/// so the caller can emit its response first.
#[must_use = "the background dispatch starts when the acknowledgment is released or dropped"]
pub struct Acknowledgement {
    accepted_at: EpochMillis,
    gate: ReleaseGate,
    background: BackgroundDispatch,
}

impl Acknowledgement {
    pub fn accepted(&self) -> bool {
        true
    }

    pub fn accepted_at(&self) -> EpochMillis {
        self.accepted_at
    }

    pub fn response(&self) -> AckResponse {
        AckResponse {
            accepted: true,
            accepted_at: self.accepted_at,
        }
    }

    /// Lets the background dispatch start and returns its handle.
    ///
    /// Awaiting the handle is optional; the dispatch runs to completion
    /// either way.
    pub fn release(self) -> BackgroundDispatch {
        let Self {
            gate, background, ..
        } = self;
        gate.open();
        background
    }
}

struct ReleaseGate {
    tx: Option<oneshot::Sender<()>>,
}

impl ReleaseGate {
    fn open(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(tx) = self.tx.take() {
            // Receiver gone means the background task was aborted.
            let _ = tx.send(());
        }
    }
}

impl Drop for ReleaseGate {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Orchestrates authorize -> snapshot -> compose -> send -> report.
pub struct ReminderCoordinator<S: TaskStore, T: MessageTransport> {
    tasks: Arc<TaskService<S>>,
    transport: Arc<T>,
    config: Arc<ReminderConfig>,
}

impl<S: TaskStore, T: MessageTransport> Clone for ReminderCoordinator<S, T> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, T> ReminderCoordinator<S, T>
where
    S: TaskStore + 'static,
    T: MessageTransport + 'static,
{
    pub fn new(tasks: Arc<TaskService<S>>, transport: Arc<T>, config: ReminderConfig) -> Self {
        Self {
            tasks,
            transport,
            config: Arc::new(config),
        }
    }

    pub fn now_ms(&self) -> EpochMillis {
        self.tasks.now_ms()
    }

    /// Accepts a trigger and defers delivery to a background task.
    ///
    /// Returns as soon as the token is checked; never waits on the store or
    /// the transport. Delivery outcome is only logged.
    ///
    /// # Errors
    /// - `Unauthorized` on token mismatch (nothing is spawned).
    /// - `NoRuntime` when called outside a Tokio runtime.
    pub fn trigger_async(&self, token: &str) -> Result<Acknowledgement, DispatchError> {
        self.authorize(token, "async")?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let accepted_at = self.tasks.now_ms();
        let (tx, rx) = oneshot::channel::<()>();
        let coordinator = self.clone();
        let background = runtime.spawn(async move {
            // Err only when the sender vanished without firing; start anyway.
            let _ = rx.await;
            let result = coordinator.dispatch().await;
            log_background_outcome(&result);
            result
        });

        info!(
            "event=reminder_trigger module=reminder status=accepted mode=async accepted_at={accepted_at}"
        );
        Ok(Acknowledgement {
            accepted_at,
            gate: ReleaseGate { tx: Some(tx) },
            background,
        })
    }

    /// Runs the full dispatch inline and reports the delivery outcome.
    ///
    /// # Errors
    /// - `Unauthorized` on token mismatch.
    /// - `Snapshot`/`Worker` when pending tasks cannot be read.
    pub async fn trigger_sync(&self, token: &str) -> Result<DispatchResult, DispatchError> {
        self.authorize(token, "sync")?;
        let outcome = self.dispatch().await?;
        info!(
            "event=reminder_trigger module=reminder status=done mode=sync outcome={}",
            outcome_code(&outcome)
        );
        Ok(outcome.into())
    }

    /// Sends a fixed test message to verify transport configuration.
    pub async fn send_probe(&self, token: &str) -> Result<DispatchResult, DispatchError> {
        self.authorize(token, "probe")?;
        let message = OutboundMessage {
            sender: self.config.sender.clone(),
            recipient: self.config.recipient.clone(),
            subject: PROBE_SUBJECT.to_string(),
            body: PROBE_BODY.to_string(),
        };
        let result = self.send(&message).await;
        match &result {
            Ok(()) => info!("event=reminder_probe module=reminder status=ok"),
            Err(err) => warn!("event=reminder_probe module=reminder status=error error={err}"),
        }
        Ok(DispatchOutcome::from_send(0, result).into())
    }

    fn authorize(&self, token: &str, mode: &'static str) -> Result<(), DispatchError> {
        let secret = self.config.trigger_secret.as_str();
        if secret.is_empty() || token != secret {
            warn!(
                "event=reminder_trigger module=reminder status=rejected mode={mode} error_code=unauthorized"
            );
            return Err(DispatchError::Unauthorized);
        }
        Ok(())
    }

    async fn dispatch(&self) -> Result<DispatchOutcome, DispatchError> {
        let tasks = Arc::clone(&self.tasks);
        let snapshot = tokio::task::spawn_blocking(move || tasks.pending())
            .await
            .map_err(|err| DispatchError::Worker(err.to_string()))??;

        let digest = ReminderDigest::new(snapshot, self.tasks.now_ms());
        if digest.is_empty() {
            info!("event=reminder_dispatch module=reminder status=skipped reason=nothing_to_send");
            return Ok(DispatchOutcome::NothingToSend);
        }

        let task_count = digest.len();
        info!(
            "event=reminder_dispatch module=reminder status=composed task_count={} generated_at={}",
            task_count,
            digest.generated_at()
        );
        let message = digest.to_message(&self.config.sender, &self.config.recipient);
        let sent = self.send(&message).await;
        Ok(DispatchOutcome::from_send(task_count, sent))
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        match self.config.send_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.transport.send(message))
                .await
                .map_err(|_| TransportError::TimedOut(limit))?,
            None => self.transport.send(message).await,
        }
    }
}

fn outcome_code(outcome: &DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::NothingToSend => "nothing_to_send",
        DispatchOutcome::Sent { .. } => "sent",
        DispatchOutcome::DeliveryFailed { .. } => "delivery_failed",
    }
}

// The trigger caller already has its acknowledgment; logs are the only
// channel left for the outcome.
fn log_background_outcome(result: &Result<DispatchOutcome, DispatchError>) {
    match result {
        Ok(DispatchOutcome::NothingToSend) => {}
        Ok(DispatchOutcome::Sent { task_count }) => info!(
            "event=reminder_dispatch module=reminder status=ok mode=async task_count={task_count}"
        ),
        Ok(DispatchOutcome::DeliveryFailed { task_count, reason }) => error!(
            "event=reminder_dispatch module=reminder status=error mode=async task_count={task_count} error_code=delivery_failed error={reason}"
        ),
        Err(err) => error!(
            "event=reminder_dispatch module=reminder status=error mode=async error_code=snapshot_failed error={err}"
        ),
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use taskminder_core::db::open_db_in_memory;
use taskminder_core::{
    Clock, ManualClock, MessageTransport, OutboundMessage, RepoResult, SqliteTaskStore, Task, TaskId,
    TaskListQuery, TaskService, TaskStore, TaskValidationError, TransportError,
};
use tokio::sync::{Notify, Semaphore};

/// 2026-03-15T12:00:00Z
pub const T0: i64 = 1_773_576_000_000;

/// Store wrapper that counts reads and writes.
pub struct CountingStore<S> {
    inner: S,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl<S: TaskStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.reads() + self.writes()
    }
}

impl<S: TaskStore> TaskStore for CountingStore<S> {
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_task(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_task(id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_task(task)
    }

    /// Counts as a read, and as a write only when something was stored.
    fn modify_task<F>(&self, id: TaskId, mutate: F) -> RepoResult<Task>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskValidationError>,
    {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.modify_task(id, mutate);
        if result.is_ok() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_task(id)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_tasks(query)
    }
}

pub type TestStore = Arc<CountingStore<SqliteTaskStore>>;

pub struct Fixture {
    pub store: TestStore,
    pub clock: Arc<ManualClock>,
    pub service: Arc<TaskService<TestStore>>,
}

pub fn fixture() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let store = Arc::new(CountingStore::new(SqliteTaskStore::new(conn)));
    let clock = Arc::new(ManualClock::new(T0));
    let service = Arc::new(TaskService::new(Arc::clone(&store), clock.clone()));
    Fixture {
        store,
        clock,
        service,
    }
}

/// Clock that follows Tokio's (possibly paused) timer from a fixed epoch.
pub struct TokioClock {
    base: i64,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(base: i64) -> Self {
        Self {
            base,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.base + self.start.elapsed().as_millis() as i64
    }
}

/// Service over a counting in-memory store with a caller-supplied clock.
pub fn service_with_clock(clock: Arc<dyn Clock>) -> (TestStore, Arc<TaskService<TestStore>>) {
    let conn = open_db_in_memory().unwrap();
    let store = Arc::new(CountingStore::new(SqliteTaskStore::new(conn)));
    let service = Arc::new(TaskService::new(Arc::clone(&store), clock));
    (store, service)
}

/// Transport double that records messages and can be held or made to fail.
#[derive(Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<OutboundMessage>>,
    attempts: AtomicUsize,
    failure: Option<String>,
    gate: Option<Semaphore>,
    started: Notify,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Every send blocks until [`RecordingTransport::open`] is called.
    pub fn held() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1_000);
        }
    }

    /// Resolves once a send has begun.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if let Some(reason) = &self.failure {
            return Err(TransportError::Rejected(reason.clone()));
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Transport that never completes.
pub struct StalledTransport;

#[async_trait]
impl MessageTransport for StalledTransport {
    async fn send(&self, _message: &OutboundMessage) -> Result<(), TransportError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

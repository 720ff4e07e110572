//! Task store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD and list-by-predicate APIs over `tasks` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Task::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - List order is `created_at ASC, id ASC` and stable within one call.
//! - `modify_task` reads, mutates and writes one row inside a single
//!   `BEGIN IMMEDIATE` transaction under the connection lock; concurrent
//!   mutations of one task never overwrite each other.

use crate::db::DbError;
use crate::model::task::{Category, Priority, Task, TaskId, TaskStatus, TaskValidationError};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    description,
    category,
    priority,
    status,
    deadline,
    created_at,
    updated_at
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for listing tasks. `None` means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub statuses: Option<Vec<TaskStatus>>,
    pub category: Option<Category>,
}

impl TaskListQuery {
    pub fn by_status(statuses: &[TaskStatus]) -> Self {
        Self {
            statuses: Some(statuses.to_vec()),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}


/// Storage contract consumed by the task lifecycle service.
pub trait TaskStore: Send + Sync {
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Fails with `NotFound` when no row has `task.id`.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Loads `id`, applies `mutate`, and persists the result as one atomic
    /// step. Returns the stored task.
    ///
    /// # Errors
    /// - `NotFound` when no row has `id`; `mutate` is not called.
    /// - `Validation` when `mutate` fails or leaves the task invalid; nothing
    ///   is written.
    fn modify_task<F>(&self, id: TaskId, mutate: F) -> RepoResult<Task>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskValidationError>;
    /// Hard delete. Fails with `NotFound` when no row has `id`.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
}

impl<S: TaskStore + ?Sized> TaskStore for Arc<S> {
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
        (**self).insert_task(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        (**self).get_task(id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        (**self).update_task(task)
    }

    fn modify_task<F>(&self, id: TaskId, mutate: F) -> RepoResult<Task>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskValidationError>,
    {
        (**self).modify_task(id, mutate)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        (**self).list_tasks(query)
    }
}

/// SQLite-backed task store.
///
/// Owns a single connection; calls are serialized through a mutex so the
/// store can be shared with blocking worker threads.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs `f` with exclusive access to the underlying connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.conn.lock();
        f(&conn)
    }
}

impl TaskStore for SqliteTaskStore {
    fn insert_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks (
                id,
                description,
                category,
                priority,
                status,
                deadline,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.id.to_string(),
                task.description.as_str(),
                task.category.as_str(),
                task.priority.as_str(),
                task.status.as_str(),
                task.deadline,
                task.created_at,
                task.updated_at,
            ],
        )?;

        Ok(task.id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let conn = self.conn.lock();
        select_task(&conn, id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let conn = self.conn.lock();
        write_task(&conn, task)
    }

    fn modify_task<F>(&self, id: TaskId, mutate: F) -> RepoResult<Task>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskValidationError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = select_task(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        mutate(&mut task)?;
        task.validate()?;
        write_task(&tx, &task)?;

        tx.commit()?;
        Ok(task)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(statuses) = &query.statuses {
            if statuses.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({placeholders})"));
            bind_values.extend(
                statuses
                    .iter()
                    .map(|status| Value::Text(status.as_str().to_string())),
            );
        }

        if let Some(category) = query.category {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.as_str().to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }
}

fn select_task(conn: &Connection, id: TaskId) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;

    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }

    Ok(None)
}

fn write_task(conn: &Connection, task: &Task) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE tasks
         SET
            description = ?1,
            category = ?2,
            priority = ?3,
            status = ?4,
            deadline = ?5,
            updated_at = ?6
         WHERE id = ?7;",
        params![
            task.description.as_str(),
            task.category.as_str(),
            task.priority.as_str(),
            task.status.as_str(),
            task.deadline,
            task.updated_at,
            task.id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(task.id));
    }

    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in tasks.id"))
    })?;

    let category_text: String = row.get("category")?;
    let category = category_text.parse::<Category>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in tasks.category"
        ))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = priority_text.parse::<Priority>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = status_text.parse::<TaskStatus>().map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let task = Task {
        id,
        description: row.get("description")?,
        category,
        priority,
        status,
        deadline: row.get("deadline")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    task.validate()
        .map_err(|err| RepoError::InvalidData(format!("task {id}: {err}")))?;
    Ok(task)
}

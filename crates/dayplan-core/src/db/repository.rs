//! Task repository implementation

use chrono::NaiveDate;
use libsql::{params, Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{NewTask, SyncStatus, Task, TaskId, TaskStatus, TaskUpdate, UserId};
use crate::util::now_ms;

/// Canonical column list; `parse_task` relies on this order.
const TASK_COLUMNS: &str = "id, title, description, date, priority, color, \
     estimated_minutes, actual_minutes, status, completed_at, moved_from_date, \
     created_at, updated_at, deleted_at, sync_status, owner_id";

/// Per-status row counts for the local store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub synced: u64,
    pub pending: u64,
    pub conflict: u64,
}

/// Trait for task storage operations
#[allow(async_fn_in_trait)]
pub trait TaskRepository {
    /// Create a new task in `Pending` sync state
    async fn create(&self, input: NewTask) -> Result<Task>;

    /// Get a task by ID (excluding deleted)
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// List tasks planned for one day (excluding deleted)
    async fn list_day(&self, date: NaiveDate) -> Result<Vec<Task>>;

    /// List tasks in an inclusive day range (excluding deleted)
    async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>>;

    /// List all tasks (excluding deleted)
    async fn list_all(&self) -> Result<Vec<Task>>;

    /// Apply a partial update; refreshes `updated_at` and marks `Pending`
    async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task>;

    /// Flip a task between open and completed
    async fn toggle_status(&self, id: &TaskId) -> Result<Task>;

    /// Move a task to another day, recording where it came from
    async fn postpone(&self, id: &TaskId, to: NaiveDate) -> Result<Task>;

    /// Soft delete a task
    async fn delete(&self, id: &TaskId) -> Result<()>;

    /// Pending records for a principal (plus unclaimed rows), stable order.
    /// Soft-deleted rows are included: deletions sync too.
    async fn pending(&self, principal: &UserId) -> Result<Vec<Task>>;

    /// Merge records fetched from the remote into the local store.
    ///
    /// Last-write-wins by `updated_at`: a remote row overwrites a local
    /// row only when the local row is not locally diverged (`Synced`) and
    /// the remote `updated_at` is equal or newer. Unknown ids are inserted
    /// as new `Synced` rows. Returns the number of rows applied.
    async fn upsert_remote(&self, tasks: &[Task]) -> Result<usize>;

    /// Mark records `Synced` and claim them for the principal
    async fn mark_synced(&self, ids: &[TaskId], principal: &UserId) -> Result<()>;

    /// Mark records `Conflict` and claim them for the principal
    async fn mark_conflict(&self, ids: &[TaskId], principal: &UserId) -> Result<()>;

    /// Row counts per sync status
    async fn status_counts(&self) -> Result<StatusCounts>;
}

/// libSQL implementation of `TaskRepository`
pub struct LibSqlTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a task from a database row (column order per `TASK_COLUMNS`)
    fn parse_task(row: &Row) -> Result<Task> {
        let id: String = row.get(0)?;
        let date: String = row.get(3)?;
        let moved_from = opt_text(row, 10)?;

        Ok(Task {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid task id: {id}")))?,
            title: row.get(1)?,
            description: opt_text(row, 2)?,
            date: date
                .parse()
                .map_err(|_| Error::Database(format!("invalid task date: {date}")))?,
            priority: row.get::<String>(4)?.parse()?,
            color: row.get(5)?,
            estimated_minutes: opt_integer(row, 6)?,
            actual_minutes: opt_integer(row, 7)?,
            status: row.get::<String>(8)?.parse()?,
            completed_at: opt_integer(row, 9)?,
            moved_from_date: moved_from
                .map(|d| {
                    d.parse()
                        .map_err(|_| Error::Database(format!("invalid moved_from_date: {d}")))
                })
                .transpose()?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            deleted_at: opt_integer(row, 13)?,
            sync_status: row.get::<String>(14)?.parse()?,
            owner: opt_text(row, 15)?.map(UserId::new).transpose()?,
        })
    }

    async fn query_tasks(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Task>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(Self::parse_task(&row)?);
        }
        Ok(tasks)
    }

    /// Write every mutable column of an existing row (`created_at` is immutable)
    async fn write_full(&self, task: &Task) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE tasks SET
                    title = ?, description = ?, date = ?, priority = ?, color = ?,
                    estimated_minutes = ?, actual_minutes = ?, status = ?, completed_at = ?,
                    moved_from_date = ?, updated_at = ?, deleted_at = ?, sync_status = ?,
                    owner_id = ?
                 WHERE id = ?",
                params![
                    task.title.clone(),
                    text_or_null(task.description.clone()),
                    task.date.to_string(),
                    task.priority.as_str(),
                    task.color.clone(),
                    integer_or_null(task.estimated_minutes),
                    integer_or_null(task.actual_minutes),
                    task.status.as_str(),
                    integer_or_null(task.completed_at),
                    text_or_null(task.moved_from_date.map(|d| d.to_string())),
                    task.updated_at,
                    integer_or_null(task.deleted_at),
                    task.sync_status.as_str(),
                    text_or_null(task.owner.as_ref().map(|o| o.as_str().to_string())),
                    task.id.as_str(),
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(task.id.to_string()));
        }
        Ok(())
    }
}

impl TaskRepository for LibSqlTaskRepository<'_> {
    async fn create(&self, input: NewTask) -> Result<Task> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput(
                "task title must not be empty".to_string(),
            ));
        }
        let task = Task::new(NewTask { title, ..input });

        self.conn
            .execute(
                &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
                params![
                    task.id.as_str(),
                    task.title.clone(),
                    text_or_null(task.description.clone()),
                    task.date.to_string(),
                    task.priority.as_str(),
                    task.color.clone(),
                    integer_or_null(task.estimated_minutes),
                    integer_or_null(task.actual_minutes),
                    task.status.as_str(),
                    integer_or_null(task.completed_at),
                    text_or_null(task.moved_from_date.map(|d| d.to_string())),
                    task.created_at,
                    task.updated_at,
                    integer_or_null(task.deleted_at),
                    task.sync_status.as_str(),
                    text_or_null(task.owner.as_ref().map(|o| o.as_str().to_string())),
                ],
            )
            .await?;

        Ok(task)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND deleted_at IS NULL"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_day(&self, date: NaiveDate) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE date = ? AND deleted_at IS NULL
                 ORDER BY created_at ASC, id ASC"
            ),
            params![date.to_string()],
        )
        .await
    }

    async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE date >= ? AND date <= ? AND deleted_at IS NULL
                 ORDER BY date ASC, created_at ASC, id ASC"
            ),
            params![start.to_string(), end.to_string()],
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE deleted_at IS NULL
                 ORDER BY date ASC, created_at ASC, id ASC"
            ),
            (),
        )
        .await
    }

    async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        let mut task = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        task.apply(update, now_ms());
        self.write_full(&task).await?;
        Ok(task)
    }

    async fn toggle_status(&self, id: &TaskId) -> Result<Task> {
        let task = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let flipped = match task.status {
            TaskStatus::Open => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Open,
        };
        self.update(
            id,
            TaskUpdate {
                status: Some(flipped),
                ..TaskUpdate::default()
            },
        )
        .await
    }

    async fn postpone(&self, id: &TaskId, to: NaiveDate) -> Result<Task> {
        let task = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if task.date == to {
            return Err(Error::InvalidInput(format!(
                "task is already scheduled on {to}"
            )));
        }
        self.update(
            id,
            TaskUpdate {
                date: Some(to),
                moved_from_date: Some(Some(task.date)),
                ..TaskUpdate::default()
            },
        )
        .await
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let now = now_ms();

        let rows = self
            .conn
            .execute(
                "UPDATE tasks SET deleted_at = ?1, updated_at = MAX(updated_at + 1, ?1),
                    sync_status = 'pending'
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn pending(&self, principal: &UserId) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE sync_status = 'pending' AND (owner_id = ? OR owner_id IS NULL)
                 ORDER BY created_at ASC, id ASC"
            ),
            params![principal.as_str()],
        )
        .await
    }

    async fn upsert_remote(&self, tasks: &[Task]) -> Result<usize> {
        let mut applied = 0usize;

        for task in tasks {
            let changed = self
                .conn
                .execute(
                    &format!(
                        "INSERT INTO tasks ({TASK_COLUMNS})
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'synced', ?)
                         ON CONFLICT(id) DO UPDATE SET
                            title = excluded.title,
                            description = excluded.description,
                            date = excluded.date,
                            priority = excluded.priority,
                            color = excluded.color,
                            estimated_minutes = excluded.estimated_minutes,
                            actual_minutes = excluded.actual_minutes,
                            status = excluded.status,
                            completed_at = excluded.completed_at,
                            moved_from_date = excluded.moved_from_date,
                            updated_at = excluded.updated_at,
                            deleted_at = excluded.deleted_at,
                            sync_status = 'synced',
                            owner_id = excluded.owner_id
                         WHERE tasks.sync_status = 'synced'
                           AND excluded.updated_at >= tasks.updated_at"
                    ),
                    params![
                        task.id.as_str(),
                        task.title.clone(),
                        text_or_null(task.description.clone()),
                        task.date.to_string(),
                        task.priority.as_str(),
                        task.color.clone(),
                        integer_or_null(task.estimated_minutes),
                        integer_or_null(task.actual_minutes),
                        task.status.as_str(),
                        integer_or_null(task.completed_at),
                        text_or_null(task.moved_from_date.map(|d| d.to_string())),
                        task.created_at,
                        task.updated_at,
                        integer_or_null(task.deleted_at),
                        text_or_null(task.owner.as_ref().map(|o| o.as_str().to_string())),
                    ],
                )
                .await?;

            applied += usize::from(changed > 0);
        }

        Ok(applied)
    }

    async fn mark_synced(&self, ids: &[TaskId], principal: &UserId) -> Result<()> {
        for id in ids {
            self.conn
                .execute(
                    "UPDATE tasks SET sync_status = 'synced', owner_id = ?1
                     WHERE id = ?2 AND (owner_id IS NULL OR owner_id = ?1)",
                    params![principal.as_str(), id.as_str()],
                )
                .await?;
        }
        Ok(())
    }

    async fn mark_conflict(&self, ids: &[TaskId], principal: &UserId) -> Result<()> {
        for id in ids {
            self.conn
                .execute(
                    "UPDATE tasks SET sync_status = 'conflict', owner_id = ?1
                     WHERE id = ?2 AND (owner_id IS NULL OR owner_id = ?1)",
                    params![principal.as_str(), id.as_str()],
                )
                .await?;
        }
        Ok(())
    }

    async fn status_counts(&self) -> Result<StatusCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT sync_status, COUNT(*) FROM tasks GROUP BY sync_status",
                (),
            )
            .await?;

        let mut counts = StatusCounts::default();
        while let Some(row) = rows.next().await? {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            #[allow(clippy::cast_sign_loss)]
            let count = count as u64;
            match status.parse::<SyncStatus>()? {
                SyncStatus::Synced => counts.synced = count,
                SyncStatus::Pending => counts.pending = count,
                SyncStatus::Conflict => counts.conflict = count,
            }
        }
        Ok(counts)
    }
}

pub(crate) fn text_or_null(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

pub(crate) fn integer_or_null(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::Database(format!(
            "expected text in column {idx}, got {other:?}"
        ))),
    }
}

fn opt_integer(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected integer in column {idx}, got {other:?}"
        ))),
    }
}

//! One sync cycle: pull, then push.

use libsql::{params, Row, Transaction, Value};

use crate::db::{integer_or_null, text_or_null, Database, LibSqlTaskRepository, TaskRepository};
use crate::models::{SyncStatus, Task, TaskId, TaskStatus, UserId, DEFAULT_COLOR};
use crate::util::now_ms;

use super::engine::{CancelToken, SyncResult};
use super::error::SyncError;
use super::remote::RemoteHandle;

/// Remote-side column list shared by pull and push. The remote table has
/// no `sync_status`: that is local bookkeeping.
const REMOTE_COLUMNS: &str = "id, title, description, date, priority, color, \
     estimated_minutes, actual_minutes, status, completed_at, moved_from_date, \
     created_at, updated_at, deleted_at, owner_id";

/// Ids staged during a push batch, resolved after commit.
#[derive(Default)]
struct BatchOutcome {
    pushed: Vec<TaskId>,
    conflicts: Vec<TaskId>,
}

/// State for a single pull-then-push cycle: the connection handle, the
/// local store, and the cycle-scoped cancellation token. Constructed
/// fresh for every cycle by the coordinator.
pub(crate) struct SyncCycle<'a> {
    remote: &'a RemoteHandle,
    db: &'a Database,
    principal: &'a UserId,
    cancel: &'a CancelToken,
}

impl<'a> SyncCycle<'a> {
    pub(crate) const fn new(
        remote: &'a RemoteHandle,
        db: &'a Database,
        principal: &'a UserId,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            remote,
            db,
            principal,
            cancel,
        }
    }

    /// Run the cycle. Pull always completes before push starts;
    /// cancellation is checked before each phase and inside the push loop.
    pub(crate) async fn run(&self) -> Result<SyncResult, SyncError> {
        self.ensure_not_cancelled()?;
        let pulled = self.pull().await?;

        self.ensure_not_cancelled()?;
        let (pushed, conflicts) = self.push().await?;

        Ok(SyncResult {
            pulled,
            pushed,
            conflicts,
            completed_at: now_ms(),
        })
    }

    fn ensure_not_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Fetch remote records visible to the principal (owned plus
    /// unclaimed), validate their shape, and merge them into the local
    /// store. Returns the count of accepted rows; malformed rows are
    /// dropped and logged, never fatal. Local writes are durable
    /// immediately and survive a later push failure.
    async fn pull(&self) -> Result<usize, SyncError> {
        let mut rows = self
            .remote
            .query(
                &format!(
                    "SELECT {REMOTE_COLUMNS} FROM tasks
                     WHERE owner_id = ? OR owner_id IS NULL"
                ),
                params![self.principal.as_str()],
            )
            .await?;

        let mut accepted = Vec::new();
        let mut dropped = 0usize;
        loop {
            let Some(row) = self.remote.timed("remote row fetch", rows.next()).await? else {
                break;
            };
            match parse_remote_row(&row) {
                Ok(task) => accepted.push(task),
                Err(reason) => {
                    dropped += 1;
                    tracing::warn!(%reason, "dropping malformed remote row");
                }
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "skipped malformed remote rows during pull");
        }

        let repo = LibSqlTaskRepository::new(self.db.connection());
        let applied = repo.upsert_remote(&accepted).await?;
        tracing::debug!(accepted = accepted.len(), applied, "pull merged remote rows");

        Ok(accepted.len())
    }

    /// Upload locally pending records inside one remote transaction.
    ///
    /// The batch is atomic: every non-conflicting record commits together
    /// or, on cancellation or any remote error, nothing does. Conflicts
    /// (remote copy strictly newer) are skipped and recorded, never fatal.
    async fn push(&self) -> Result<(usize, usize), SyncError> {
        let repo = LibSqlTaskRepository::new(self.db.connection());

        let pending = repo.pending(self.principal).await?;
        if pending.is_empty() {
            return Ok((0, 0));
        }

        let tx = self.remote.begin().await?;
        let outcome = match self.stage_batch(&tx, &pending).await {
            Ok(outcome) => outcome,
            Err(error) => {
                if let Err(rollback_error) = self.remote.timed("remote rollback", tx.rollback()).await
                {
                    tracing::warn!(%rollback_error, "rollback after failed push batch also failed");
                }
                return Err(error);
            }
        };
        self.remote.timed("remote commit", tx.commit()).await?;

        // Local status writes happen outside the remote transaction but
        // before push returns.
        repo.mark_synced(&outcome.pushed, self.principal).await?;
        repo.mark_conflict(&outcome.conflicts, self.principal)
            .await?;

        if outcome.conflicts.is_empty() {
            tracing::debug!(pushed = outcome.pushed.len(), "push batch committed");
        } else {
            tracing::warn!(
                pushed = outcome.pushed.len(),
                conflicts = outcome.conflicts.len(),
                "push batch committed with conflicts"
            );
        }

        Ok((outcome.pushed.len(), outcome.conflicts.len()))
    }

    async fn stage_batch(
        &self,
        tx: &Transaction,
        pending: &[Task],
    ) -> Result<BatchOutcome, SyncError> {
        let mut outcome = BatchOutcome::default();

        for task in pending {
            self.ensure_not_cancelled()?;

            if let Some(remote_updated) = self.remote_updated_at(tx, &task.id).await? {
                // Strictly newer remote copy wins; a tie favors the push.
                if remote_updated > task.updated_at {
                    tracing::debug!(id = %task.id, "remote copy is newer, keeping it");
                    outcome.conflicts.push(task.id);
                    continue;
                }
            }

            self.upsert_to_remote(tx, task).await?;
            outcome.pushed.push(task.id);
        }

        Ok(outcome)
    }

    async fn remote_updated_at(
        &self,
        tx: &Transaction,
        id: &TaskId,
    ) -> Result<Option<i64>, SyncError> {
        let mut rows = self
            .remote
            .timed(
                "remote conflict check",
                tx.query(
                    "SELECT updated_at FROM tasks WHERE id = ?",
                    params![id.as_str()],
                ),
            )
            .await?;

        match self.remote.timed("remote conflict check", rows.next()).await? {
            Some(row) => Ok(Some(row.get(0).map_err(SyncError::Remote)?)),
            None => Ok(None),
        }
    }

    /// Insert-or-update the record's full content, stamped with the
    /// current principal as owner. `created_at` is only set on insert.
    async fn upsert_to_remote(&self, tx: &Transaction, task: &Task) -> Result<(), SyncError> {
        self.remote
            .timed(
                "remote upsert",
                tx.execute(
                    &format!(
                        "INSERT INTO tasks ({REMOTE_COLUMNS})
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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
                            owner_id = excluded.owner_id"
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
                        self.principal.as_str(),
                    ],
                ),
            )
            .await?;
        Ok(())
    }
}

/// Validate the minimum required shape of a remote row and convert it
/// into a local record. Required: a UUID id, non-empty title, parseable
/// date, integer created/updated timestamps. Everything else falls back
/// to defaults when absent or unreadable.
fn parse_remote_row(row: &Row) -> Result<Task, String> {
    let id = require_text(row, 0, "id")?;
    let id: TaskId = id.parse().map_err(|_| format!("id is not a UUID: {id}"))?;
    let title = require_text(row, 1, "title")?;
    let date = require_text(row, 3, "date")?;
    let date = date
        .parse()
        .map_err(|_| format!("date is not a calendar day: {date}"))?;
    let created_at = require_integer(row, 11, "created_at")?;
    let updated_at = require_integer(row, 12, "updated_at")?;

    Ok(Task {
        id,
        title,
        description: optional_text(row, 2),
        date,
        priority: optional_text(row, 4)
            .and_then(|p| p.parse().ok())
            .unwrap_or_default(),
        color: optional_text(row, 5).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        estimated_minutes: optional_integer(row, 6),
        actual_minutes: optional_integer(row, 7),
        status: optional_text(row, 8)
            .and_then(|s| s.parse().ok())
            .unwrap_or(TaskStatus::Open),
        completed_at: optional_integer(row, 9),
        moved_from_date: optional_text(row, 10).and_then(|d| d.parse().ok()),
        created_at,
        updated_at,
        deleted_at: optional_integer(row, 13),
        sync_status: SyncStatus::Synced,
        owner: optional_text(row, 14).and_then(|o| UserId::new(o).ok()),
    })
}

fn require_text(row: &Row, idx: i32, field: &str) -> Result<String, String> {
    match row.get_value(idx) {
        Ok(Value::Text(text)) if !text.trim().is_empty() => Ok(text),
        Ok(other) => Err(format!("{field}: expected non-empty text, got {other:?}")),
        Err(error) => Err(format!("{field}: {error}")),
    }
}

fn require_integer(row: &Row, idx: i32, field: &str) -> Result<i64, String> {
    match row.get_value(idx) {
        Ok(Value::Integer(value)) => Ok(value),
        Ok(other) => Err(format!("{field}: expected integer, got {other:?}")),
        Err(error) => Err(format!("{field}: {error}")),
    }
}

fn optional_text(row: &Row, idx: i32) -> Option<String> {
    match row.get_value(idx) {
        Ok(Value::Text(text)) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

fn optional_integer(row: &Row, idx: i32) -> Option<i64> {
    match row.get_value(idx) {
        Ok(Value::Integer(value)) => Some(value),
        _ => None,
    }
}

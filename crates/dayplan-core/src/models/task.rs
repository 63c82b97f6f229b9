//! Task model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::models::UserId;
use crate::util::now_ms;

/// Default task color (hex)
pub const DEFAULT_COLOR: &str = "#e5e7eb";

/// A unique identifier for a task, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Task priority levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Stable storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::InvalidInput(format!("unknown priority: {other}"))),
        }
    }
}

/// Open/completed task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Completed,
}

impl TaskStatus {
    /// Stable storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "completed" => Ok(Self::Completed),
            other => Err(Error::InvalidInput(format!("unknown status: {other}"))),
        }
    }
}

/// Per-record synchronization state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Identical content on both copies as of `updated_at`
    Synced,
    /// Local content strictly newer than (or never pushed to) the remote
    #[default]
    Pending,
    /// Local edits were suppressed in favor of a newer remote copy;
    /// content is not authoritative until the user re-edits the record
    Conflict,
}

impl SyncStatus {
    /// Stable storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(Self::Synced),
            "pending" => Ok(Self::Pending),
            "conflict" => Ok(Self::Conflict),
            other => Err(Error::InvalidInput(format!("unknown sync status: {other}"))),
        }
    }
}

/// A task in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (client-generated, stable across copies)
    pub id: TaskId,
    /// Short title
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// The calendar day the task is planned for
    pub date: NaiveDate,
    /// Priority level
    pub priority: Priority,
    /// Display color (hex)
    pub color: String,
    /// Estimated duration in minutes
    pub estimated_minutes: Option<i64>,
    /// Actual duration in minutes
    pub actual_minutes: Option<i64>,
    /// Open/completed status
    pub status: TaskStatus,
    /// Completion timestamp (unix ms)
    pub completed_at: Option<i64>,
    /// The day this task was postponed from, if it was ever moved
    pub moved_from_date: Option<NaiveDate>,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
    /// Last update timestamp (unix ms, advances on every mutation)
    pub updated_at: i64,
    /// Soft delete timestamp (unix ms)
    pub deleted_at: Option<i64>,
    /// Synchronization state
    pub sync_status: SyncStatus,
    /// Owning principal (None = unclaimed/legacy local-only record)
    pub owner: Option<UserId>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub priority: Option<Priority>,
    pub color: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub owner: Option<UserId>,
}

impl NewTask {
    /// Minimal input: a title and a day.
    #[must_use]
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            date,
            priority: None,
            color: None,
            estimated_minutes: None,
            owner: None,
        }
    }
}

/// Partial update for an existing task.
///
/// Outer `None` leaves the field untouched; for nullable fields the inner
/// `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub color: Option<String>,
    pub estimated_minutes: Option<Option<i64>>,
    pub actual_minutes: Option<Option<i64>>,
    pub status: Option<TaskStatus>,
    pub moved_from_date: Option<Option<NaiveDate>>,
    pub owner: Option<UserId>,
}

impl Task {
    /// Create a new task from user input, in `Pending` sync state.
    #[must_use]
    pub fn new(input: NewTask) -> Self {
        let now = now_ms();
        Self {
            id: TaskId::new(),
            title: input.title,
            description: input.description,
            date: input.date,
            priority: input.priority.unwrap_or_default(),
            color: input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            estimated_minutes: input.estimated_minutes,
            actual_minutes: None,
            status: TaskStatus::Open,
            completed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            sync_status: SyncStatus::Pending,
            owner: input.owner,
            moved_from_date: None,
        }
    }

    /// Apply a partial update at wall-clock `now`.
    ///
    /// Every update advances `updated_at` and marks the record `Pending`,
    /// which is also the path that clears a `Conflict` state.
    pub fn apply(&mut self, update: TaskUpdate, now: i64) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(estimated) = update.estimated_minutes {
            self.estimated_minutes = estimated;
        }
        if let Some(actual) = update.actual_minutes {
            self.actual_minutes = actual;
        }
        if let Some(status) = update.status {
            if status == TaskStatus::Completed && self.status != TaskStatus::Completed {
                self.completed_at = Some(now);
            } else if status == TaskStatus::Open && self.status == TaskStatus::Completed {
                self.completed_at = None;
            }
            self.status = status;
        }
        if let Some(moved_from) = update.moved_from_date {
            self.moved_from_date = moved_from;
        }
        if let Some(owner) = update.owner {
            self.owner = Some(owner);
        }
        self.touch(now);
    }

    /// Soft delete at wall-clock `now`. The row stays visible to sync
    /// bookkeeping until reconciled.
    pub fn soft_delete(&mut self, now: i64) {
        self.deleted_at = Some(now);
        self.touch(now);
    }

    /// Whether the task has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    // `updated_at` must advance on every mutation even when the wall
    // clock has not ticked since the last write.
    fn touch(&mut self, now: i64) {
        self.updated_at = now.max(self.updated_at + 1);
        self.sync_status = SyncStatus::Pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn task_id_unique() {
        let id1 = TaskId::new();
        let id2 = TaskId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn task_id_parse_roundtrip() {
        let id = TaskId::new();
        let parsed: TaskId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn new_task_defaults() {
        let task = Task::new(NewTask::new("Buy milk", day("2025-03-14")));
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.priority, Priority::Normal);
        assert_eq!(task.color, DEFAULT_COLOR);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.sync_status, SyncStatus::Pending);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.owner.is_none());
        assert!(!task.is_deleted());
    }

    #[test]
    fn apply_marks_pending_and_advances_updated_at() {
        let mut task = Task::new(NewTask::new("Write report", day("2025-03-14")));
        task.sync_status = SyncStatus::Synced;
        let before = task.updated_at;

        task.apply(
            TaskUpdate {
                title: Some("Write quarterly report".to_string()),
                ..TaskUpdate::default()
            },
            before, // same clock reading: must still advance
        );

        assert_eq!(task.title, "Write quarterly report");
        assert_eq!(task.sync_status, SyncStatus::Pending);
        assert!(task.updated_at > before);
    }

    #[test]
    fn apply_clears_conflict_state() {
        let mut task = Task::new(NewTask::new("Call dentist", day("2025-03-14")));
        task.sync_status = SyncStatus::Conflict;

        task.apply(TaskUpdate::default(), task.updated_at + 10);
        assert_eq!(task.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn completing_sets_completed_at_and_reopening_clears_it() {
        let mut task = Task::new(NewTask::new("Water plants", day("2025-03-14")));
        let t1 = task.updated_at + 5;

        task.apply(
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..TaskUpdate::default()
            },
            t1,
        );
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(t1));

        task.apply(
            TaskUpdate {
                status: Some(TaskStatus::Open),
                ..TaskUpdate::default()
            },
            t1 + 5,
        );
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn completing_twice_keeps_original_completion_time() {
        let mut task = Task::new(NewTask::new("Ship package", day("2025-03-14")));
        let t1 = task.updated_at + 5;
        task.apply(
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..TaskUpdate::default()
            },
            t1,
        );
        task.apply(
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..TaskUpdate::default()
            },
            t1 + 100,
        );
        assert_eq!(task.completed_at, Some(t1));
    }

    #[test]
    fn soft_delete_marks_pending() {
        let mut task = Task::new(NewTask::new("Old chore", day("2025-03-14")));
        task.sync_status = SyncStatus::Synced;
        let now = task.updated_at + 1;

        task.soft_delete(now);
        assert!(task.is_deleted());
        assert_eq!(task.deleted_at, Some(now));
        assert_eq!(task.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn enum_storage_roundtrips() {
        for priority in [
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Critical,
        ] {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
        for status in [SyncStatus::Synced, SyncStatus::Pending, SyncStatus::Conflict] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("urgent".parse::<Priority>().is_err());
    }
}

use std::env;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dayplan_core::db::Database;
use dayplan_core::models::{Task, TaskStatus};
use dayplan_core::sync::RemoteConfig;
use dayplan_core::{TaskId, UserId};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub priority: String,
    pub status: String,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub moved_from_date: Option<String>,
    pub sync_status: String,
}

pub fn task_to_item(task: &Task) -> TaskListItem {
    TaskListItem {
        id: task.id.as_str(),
        title: task.title.clone(),
        description: task.description.clone(),
        date: task.date.to_string(),
        priority: task.priority.to_string(),
        status: task.status.to_string(),
        estimated_minutes: task.estimated_minutes,
        actual_minutes: task.actual_minutes,
        moved_from_date: task.moved_from_date.map(|d| d.to_string()),
        sync_status: task.sync_status.to_string(),
    }
}

pub fn format_task_lines(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            let mark = match task.status {
                TaskStatus::Completed => "[x]",
                TaskStatus::Open => "[ ]",
            };
            format!(
                "{}  {}  {} {:<8} {}",
                task.id, task.date, mark, task.priority, task.title
            )
        })
        .collect()
}

/// Resolve the local database path: explicit flag, then `DAYPLAN_DB_PATH`,
/// then the platform data directory.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = env::var("DAYPLAN_DB_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dayplan")
        .join("dayplan.db")
}

pub async fn open_database(db_path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(db_path).await?)
}

pub fn parse_task_id(id: &str) -> Result<TaskId, CliError> {
    id.trim()
        .parse()
        .map_err(|_| CliError::InvalidTaskId(id.to_string()))
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    let title = parts.join(" ").trim().to_string();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }
    Ok(title)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Remote configuration from the environment, if fully provided.
pub fn remote_config_from_env() -> Option<RemoteConfig> {
    parse_remote_config(
        env::var("DAYPLAN_SYNC_URL").ok(),
        env::var("DAYPLAN_SYNC_TOKEN").ok(),
    )
}

pub fn parse_remote_config(url: Option<String>, auth_token: Option<String>) -> Option<RemoteConfig> {
    let url = url?.trim().to_string();
    let auth_token = auth_token?.trim().to_string();

    if url.is_empty() || auth_token.is_empty() {
        return None;
    }

    Some(RemoteConfig::new(url, auth_token))
}

/// Resolve the sync principal: explicit flag, then `DAYPLAN_USER`.
pub fn resolve_user(explicit: Option<&str>) -> Result<UserId, CliError> {
    let raw = match explicit {
        Some(user) => user.to_string(),
        None => env::var("DAYPLAN_USER").unwrap_or_default(),
    };
    UserId::new(raw).map_err(|_| CliError::NoUser)
}

use std::path::Path;

use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};
use dayplan_core::models::TaskStatus;

use crate::commands::common::{open_database, parse_task_id};
use crate::error::CliError;

pub async fn run_done(id: &str, db_path: &Path) -> Result<(), CliError> {
    let task_id = parse_task_id(id)?;
    let db = open_database(db_path).await?;
    let repo = LibSqlTaskRepository::new(db.connection());

    let task = repo.toggle_status(&task_id).await.map_err(|error| {
        if matches!(error, dayplan_core::Error::NotFound(_)) {
            CliError::TaskNotFound(id.to_string())
        } else {
            error.into()
        }
    })?;

    match task.status {
        TaskStatus::Completed => println!("Completed: {}", task.title),
        TaskStatus::Open => println!("Reopened: {}", task.title),
    }
    Ok(())
}

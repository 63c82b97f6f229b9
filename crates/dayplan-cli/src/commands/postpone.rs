use std::path::Path;

use chrono::{Days, NaiveDate};
use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};

use crate::commands::common::{open_database, parse_task_id};
use crate::error::CliError;

pub async fn run_postpone(id: &str, to: Option<NaiveDate>, db_path: &Path) -> Result<(), CliError> {
    let task_id = parse_task_id(id)?;
    let db = open_database(db_path).await?;
    let repo = LibSqlTaskRepository::new(db.connection());

    let current = repo
        .get(&task_id)
        .await?
        .ok_or_else(|| CliError::TaskNotFound(id.to_string()))?;
    let target = match to {
        Some(date) => date,
        None => current.date.checked_add_days(Days::new(1)).ok_or_else(|| {
            CliError::Core(dayplan_core::Error::InvalidInput(
                "target day is out of range".to_string(),
            ))
        })?,
    };

    let task = repo.postpone(&task_id, target).await?;
    println!("Moved \"{}\" to {}", task.title, task.date);
    Ok(())
}

use std::path::Path;

use chrono::NaiveDate;
use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};
use dayplan_core::models::{NewTask, Priority};

use crate::commands::common::{normalize_title, open_database, today};
use crate::error::CliError;

#[allow(clippy::too_many_arguments)]
pub async fn run_add(
    title_parts: &[String],
    date: Option<NaiveDate>,
    priority: Option<Priority>,
    estimate: Option<i64>,
    color: Option<String>,
    description: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let title = normalize_title(title_parts)?;

    let db = open_database(db_path).await?;
    let repo = LibSqlTaskRepository::new(db.connection());
    let task = repo
        .create(NewTask {
            title,
            description,
            date: date.unwrap_or_else(today),
            priority,
            color,
            estimated_minutes: estimate,
            owner: None,
        })
        .await?;

    println!("{}", task.id);
    Ok(())
}

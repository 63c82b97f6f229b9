use std::path::Path;

use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};

use crate::commands::common::{open_database, parse_task_id};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let task_id = parse_task_id(id)?;
    let db = open_database(db_path).await?;
    let repo = LibSqlTaskRepository::new(db.connection());

    repo.delete(&task_id).await.map_err(|error| {
        if matches!(error, dayplan_core::Error::NotFound(_)) {
            CliError::TaskNotFound(id.to_string())
        } else {
            error.into()
        }
    })?;

    println!("{task_id}");
    Ok(())
}

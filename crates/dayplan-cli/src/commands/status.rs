use std::path::Path;

use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};
use serde::Serialize;

use crate::commands::common::open_database;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusItem {
    synced: u64,
    pending: u64,
    conflict: u64,
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlTaskRepository::new(db.connection());
    let counts = repo.status_counts().await?;

    if as_json {
        let item = StatusItem {
            synced: counts.synced,
            pending: counts.pending,
            conflict: counts.conflict,
        };
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!("synced:   {}", counts.synced);
    println!("pending:  {}", counts.pending);
    println!("conflict: {}", counts.conflict);
    Ok(())
}

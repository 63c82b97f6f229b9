use std::path::Path;

use chrono::NaiveDate;
use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};
use dayplan_core::models::Task;

use crate::commands::common::{format_task_lines, open_database, task_to_item, today, TaskListItem};
use crate::error::CliError;

pub struct ListArgs {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub all: bool,
    pub json: bool,
}

pub async fn run_list(args: ListArgs, db_path: &Path) -> Result<(), CliError> {
    let tasks = list_tasks(&args, db_path).await?;

    if args.json {
        let items = tasks.iter().map(task_to_item).collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if tasks.is_empty() {
        println!("No tasks.");
    } else {
        for line in format_task_lines(&tasks) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn list_tasks(args: &ListArgs, db_path: &Path) -> Result<Vec<Task>, CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlTaskRepository::new(db.connection());

    if args.all {
        return Ok(repo.list_all().await?);
    }
    if let (Some(from), Some(to)) = (args.from, args.to) {
        return Ok(repo.list_range(from, to).await?);
    }
    Ok(repo.list_day(args.date.unwrap_or_else(today)).await?)
}

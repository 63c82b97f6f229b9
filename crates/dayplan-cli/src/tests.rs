use std::path::PathBuf;

use chrono::NaiveDate;
use dayplan_core::db::{LibSqlTaskRepository, TaskRepository};
use dayplan_core::models::TaskStatus;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::commands::add::run_add;
use crate::commands::common::{
    normalize_title, open_database, parse_remote_config, parse_task_id, resolve_db_path,
    resolve_user,
};
use crate::commands::delete::run_delete;
use crate::commands::done::run_done;
use crate::commands::postpone::run_postpone;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn normalize_title_joins_and_rejects_empty() {
    assert_eq!(
        normalize_title(&["Buy".to_string(), "milk".to_string()]).unwrap(),
        "Buy milk"
    );
    assert!(matches!(
        normalize_title(&[" ".to_string()]),
        Err(CliError::EmptyTitle)
    ));
}

#[test]
fn parse_task_id_rejects_garbage() {
    assert!(parse_task_id("not-a-uuid").is_err());
    let id = dayplan_core::TaskId::new();
    assert_eq!(parse_task_id(&id.as_str()).unwrap(), id);
}

#[test]
fn parse_remote_config_requires_both_values() {
    assert!(parse_remote_config(None, None).is_none());
    assert!(parse_remote_config(Some("libsql://x".to_string()), None).is_none());
    assert!(parse_remote_config(Some("  ".to_string()), Some("t".to_string())).is_none());
    assert!(
        parse_remote_config(Some("libsql://x".to_string()), Some("t".to_string())).is_some()
    );
}

#[test]
fn resolve_db_path_prefers_explicit_flag() {
    let explicit = PathBuf::from("/tmp/elsewhere.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn resolve_user_accepts_explicit_principal() {
    assert_eq!(resolve_user(Some("alice")).unwrap().as_str(), "alice");
    assert!(matches!(resolve_user(Some("  ")), Err(CliError::NoUser)));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_done_postpone_delete_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("dayplan.db");

    run_add(
        &["Write".to_string(), "tests".to_string()],
        Some(day("2025-03-14")),
        None,
        Some(30),
        None,
        None,
        &db_path,
    )
    .await
    .unwrap();

    let db = open_database(&db_path).await.unwrap();
    let repo = LibSqlTaskRepository::new(db.connection());
    let created = repo.list_day(day("2025-03-14")).await.unwrap().remove(0);
    assert_eq!(created.title, "Write tests");
    assert_eq!(created.estimated_minutes, Some(30));
    let id = created.id.as_str();

    run_done(&id, &db_path).await.unwrap();
    let completed = repo.get(&created.id).await.unwrap().unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);

    run_postpone(&id, None, &db_path).await.unwrap();
    let moved = repo.get(&created.id).await.unwrap().unwrap();
    assert_eq!(moved.date, day("2025-03-15"));
    assert_eq!(moved.moved_from_date, Some(day("2025-03-14")));

    run_delete(&id, &db_path).await.unwrap();
    assert!(repo.get(&created.id).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn done_reports_missing_task() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("dayplan.db");

    let id = dayplan_core::TaskId::new().as_str();
    let result = run_done(&id, &db_path).await;
    assert!(matches!(result, Err(CliError::TaskNotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_runs_on_fresh_store() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("dayplan.db");
    run_status(true, &db_path).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_without_configuration_is_a_clear_error() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("dayplan.db");

    // No DAYPLAN_SYNC_URL/DAYPLAN_SYNC_TOKEN in the test environment.
    let result = run_sync(Some("alice"), &db_path).await;
    assert!(matches!(result, Err(CliError::SyncNotConfigured)));
}

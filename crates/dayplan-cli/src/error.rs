use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] dayplan_core::Error),
    #[error(transparent)]
    Sync(#[from] dayplan_core::sync::SyncError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No task title provided")]
    EmptyTitle,
    #[error("Invalid task id: {0}")]
    InvalidTaskId(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error(
        "Sync is not configured. Set DAYPLAN_SYNC_URL and DAYPLAN_SYNC_TOKEN to enable `dayplan sync`."
    )]
    SyncNotConfigured,
    #[error("No principal configured. Pass --user or set DAYPLAN_USER.")]
    NoUser,
    #[error("Could not connect to the remote store")]
    ConnectFailed,
}

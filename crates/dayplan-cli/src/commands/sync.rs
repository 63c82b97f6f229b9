use std::path::Path;
use std::sync::Arc;

use dayplan_core::SyncEngine;
use tokio::sync::Mutex;

use crate::commands::common::{open_database, remote_config_from_env, resolve_user};
use crate::error::CliError;

pub async fn run_sync(user: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let config = remote_config_from_env().ok_or(CliError::SyncNotConfigured)?;
    let principal = resolve_user(user)?;

    let db = open_database(db_path).await?;
    let engine = SyncEngine::new(Arc::new(Mutex::new(db)), config);
    engine.set_principal(Some(principal));

    if !engine.connect().await {
        return Err(CliError::ConnectFailed);
    }

    let outcome = engine.sync().await;
    engine.disconnect().await;

    match outcome? {
        Some(result) => {
            println!(
                "Pulled {}, pushed {}, conflicts {}",
                result.pulled, result.pushed, result.conflicts
            );
            if result.conflicts > 0 {
                println!("Conflicted tasks keep your local text; edit them to sync again.");
            }
        }
        None => println!("Sync skipped: another cycle is already running"),
    }
    Ok(())
}

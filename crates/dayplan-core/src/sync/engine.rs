//! Sync coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::db::Database;
use crate::models::UserId;

use super::config::RemoteConfig;
use super::cycle::SyncCycle;
use super::error::SyncError;
use super::remote::RemoteConnectionManager;

/// Cooperative cancellation token scoped to one sync cycle.
///
/// Checked only at phase boundaries and inside the push loop; it never
/// interrupts an in-flight remote call.
#[derive(Clone, Debug, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one completed sync cycle. Immutable once produced; the
/// coordinator retains only the most recent one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Remote rows accepted during pull
    pub pulled: usize,
    /// Records uploaded during push
    pub pushed: usize,
    /// Records whose push was suppressed by a newer remote copy
    pub conflicts: usize,
    /// Completion time (unix ms)
    pub completed_at: i64,
}

/// Read-only snapshot of the coordinator, safe to take concurrently
/// with a running cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    pub syncing: bool,
    pub last_result: Option<SyncResult>,
    pub last_error: Option<String>,
}

/// Coordinator state. The tagged representation makes a cancellation
/// request unrepresentable while idle.
enum EngineState {
    Idle,
    Syncing { cancel: CancelToken },
}

struct EngineInner {
    state: EngineState,
    last_result: Option<SyncResult>,
    last_error: Option<String>,
}

/// Orchestrates sync cycles against the remote store.
///
/// At most one cycle runs at a time; concurrent `sync` callers are
/// dropped, not queued. The coordinator is the sole owner of the remote
/// connection.
pub struct SyncEngine {
    db: Arc<AsyncMutex<Database>>,
    remote: AsyncMutex<RemoteConnectionManager>,
    principal: Mutex<Option<UserId>>,
    inner: Mutex<EngineInner>,
}

impl SyncEngine {
    /// Create an engine over the shared local store.
    pub fn new(db: Arc<AsyncMutex<Database>>, config: RemoteConfig) -> Self {
        Self {
            db,
            remote: AsyncMutex::new(RemoteConnectionManager::new(config)),
            principal: Mutex::new(None),
            inner: Mutex::new(EngineInner {
                state: EngineState::Idle,
                last_result: None,
                last_error: None,
            }),
        }
    }

    /// Set (or clear) the active principal. Pure assignment: no I/O. An
    /// open connection is not torn down here, but it stops serving
    /// `sync` until the caller reconnects for the new principal.
    pub fn set_principal(&self, principal: Option<UserId>) {
        *lock(&self.principal) = principal;
    }

    /// The currently active principal, if any
    #[must_use]
    pub fn principal(&self) -> Option<UserId> {
        lock(&self.principal).clone()
    }

    /// Open the remote connection for the current principal.
    ///
    /// Returns `false` (never raises) when no principal is set or after
    /// the manager's retries are exhausted.
    pub async fn connect(&self) -> bool {
        let Some(principal) = self.principal() else {
            tracing::warn!("connect requested with no principal set");
            return false;
        };
        self.remote.lock().await.connect(&principal).await
    }

    /// Close the remote connection. Idempotent.
    pub async fn disconnect(&self) {
        self.remote.lock().await.disconnect();
    }

    /// Run one pull-then-push cycle.
    ///
    /// Returns `Ok(None)` without doing anything when a cycle is already
    /// running, no principal is set, or no connection is open for the
    /// current principal. On success the result is retained for
    /// [`Self::progress`]; on failure the error message is retained and
    /// the error propagated. The engine returns to idle on every path.
    pub async fn sync(&self) -> Result<Option<SyncResult>, SyncError> {
        let Some(principal) = self.principal() else {
            tracing::debug!("sync skipped: no principal set");
            return Ok(None);
        };
        let Some(cancel) = self.try_begin() else {
            tracing::debug!("sync skipped: a cycle is already running");
            return Ok(None);
        };

        let remote = self.remote.lock().await;
        let Some(handle) = remote.session_handle(&principal) else {
            tracing::debug!("sync skipped: no open connection for the current principal");
            lock(&self.inner).state = EngineState::Idle;
            return Ok(None);
        };

        lock(&self.inner).last_error = None;
        tracing::info!(%principal, "starting sync cycle");

        let db = self.db.lock().await;
        let outcome = SyncCycle::new(handle, &db, &principal, &cancel).run().await;
        drop(db);
        drop(remote);

        self.finish(outcome)
    }

    /// Request cancellation of the running cycle, if any. Cooperative:
    /// takes effect at the next checkpoint.
    pub fn cancel_sync(&self) {
        if let EngineState::Syncing { cancel } = &lock(&self.inner).state {
            tracing::info!("sync cancellation requested");
            cancel.cancel();
        }
    }

    /// Snapshot of the current phase and the last definitive outcome
    #[must_use]
    pub fn progress(&self) -> SyncProgress {
        let inner = lock(&self.inner);
        SyncProgress {
            syncing: matches!(inner.state, EngineState::Syncing { .. }),
            last_result: inner.last_result.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Single-flight guard: transition Idle -> Syncing with a fresh
    /// cancellation token, or return None if a cycle is running.
    fn try_begin(&self) -> Option<CancelToken> {
        let mut inner = lock(&self.inner);
        if matches!(inner.state, EngineState::Syncing { .. }) {
            return None;
        }
        let cancel = CancelToken::default();
        inner.state = EngineState::Syncing {
            cancel: cancel.clone(),
        };
        Some(cancel)
    }

    /// Record the cycle outcome. The transition back to Idle is
    /// unconditional.
    fn finish(&self, outcome: Result<SyncResult, SyncError>) -> Result<Option<SyncResult>, SyncError> {
        let mut inner = lock(&self.inner);
        inner.state = EngineState::Idle;
        match outcome {
            Ok(result) => {
                if result.conflicts > 0 {
                    tracing::warn!(conflicts = result.conflicts, "sync completed with conflicts");
                } else {
                    tracing::info!(
                        pulled = result.pulled,
                        pushed = result.pushed,
                        "sync completed"
                    );
                }
                inner.last_result = Some(result.clone());
                Ok(Some(result))
            }
            Err(error) => {
                tracing::error!(%error, "sync failed");
                inner.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }
}

// Engine state is only ever held for short, await-free sections; a
// poisoned lock still carries consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LibSqlTaskRepository, TaskRepository};
    use crate::models::{NewTask, SyncStatus};
    use crate::sync::config::RetryConfig;
    use crate::sync::testutil::{insert_remote_row, remote_in_memory, remote_row_count};
    use std::time::Duration;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn test_config() -> RemoteConfig {
        RemoteConfig::new("http://127.0.0.1:9", "token")
            .with_connect_timeout(Duration::from_millis(200))
            .with_retry(RetryConfig::no_retry())
    }

    async fn engine_with_store() -> SyncEngine {
        let db = Database::open_in_memory().await.unwrap();
        SyncEngine::new(Arc::new(AsyncMutex::new(db)), test_config())
    }

    /// Engine with a principal set and an in-memory "remote" attached.
    async fn connected_engine(principal: &UserId) -> SyncEngine {
        let engine = engine_with_store().await;
        engine.set_principal(Some(principal.clone()));
        engine
            .remote
            .lock()
            .await
            .attach_for_tests(principal.clone(), remote_in_memory().await);
        engine
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_is_a_no_op_without_principal() {
        let engine = engine_with_store().await;
        assert!(engine.sync().await.unwrap().is_none());
        assert!(!engine.progress().syncing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_is_a_no_op_without_connection() {
        let engine = engine_with_store().await;
        engine.set_principal(Some(user("alice")));

        assert!(engine.sync().await.unwrap().is_none());
        assert!(!engine.progress().syncing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connect_without_principal_is_false() {
        let engine = engine_with_store().await;
        assert!(!engine.connect().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn single_flight_drops_concurrent_entry() {
        let engine = engine_with_store().await;

        let first = engine.try_begin().unwrap();
        assert!(engine.try_begin().is_none());
        assert!(engine.progress().syncing);

        // A sync() call while a cycle is marked running is dropped even
        // with principal and connection available.
        engine.set_principal(Some(user("alice")));
        assert!(engine.sync().await.unwrap().is_none());

        engine.finish(Err(SyncError::Cancelled)).unwrap_err();
        assert!(!engine.progress().syncing);
        assert!(engine.try_begin().is_some());
        drop(first);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_for_old_principal_does_not_serve_new_one() {
        let alice = user("alice");
        let engine = connected_engine(&alice).await;

        engine.set_principal(Some(user("bob")));
        assert!(engine.sync().await.unwrap().is_none());
        assert!(!engine.progress().syncing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_while_idle_is_a_no_op() {
        let alice = user("alice");
        let engine = connected_engine(&alice).await;

        engine.cancel_sync();

        // The stale request must not leak into the next cycle.
        let result = engine.sync().await.unwrap().unwrap();
        assert_eq!(result.pushed, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn full_cycle_records_last_result() {
        let alice = user("alice");
        let engine = connected_engine(&alice).await;

        {
            let db = engine.db.lock().await;
            let repo = LibSqlTaskRepository::new(db.connection());
            repo.create(NewTask::new("Buy milk", "2025-03-14".parse().unwrap()))
                .await
                .unwrap();
        }

        let result = engine.sync().await.unwrap().unwrap();
        assert_eq!(result.pushed, 1);

        let progress = engine.progress();
        assert!(!progress.syncing);
        assert_eq!(progress.last_result, Some(result));
        assert_eq!(progress.last_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_cycle_records_last_error_and_returns_to_idle() {
        let alice = user("alice");
        let engine = connected_engine(&alice).await;

        {
            let db = engine.db.lock().await;
            let repo = LibSqlTaskRepository::new(db.connection());
            repo.create(NewTask::new("Buy milk", "2025-03-14".parse().unwrap()))
                .await
                .unwrap();
        }
        // Sabotage the remote so pull fails
        engine
            .remote
            .lock()
            .await
            .session_handle(&alice)
            .unwrap()
            .connection()
            .execute("DROP TABLE tasks", ())
            .await
            .unwrap();

        let error = engine.sync().await.unwrap_err();
        assert!(matches!(error, SyncError::Remote(_)));

        let progress = engine.progress();
        assert!(!progress.syncing);
        assert!(progress.last_error.is_some());

        // The engine is idle again and a later cycle clears the error.
        engine
            .remote
            .lock()
            .await
            .attach_for_tests(alice.clone(), remote_in_memory().await);
        engine.sync().await.unwrap().unwrap();
        assert_eq!(engine.progress().last_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_effects_survive_a_push_failure() {
        let alice = user("alice");
        let engine = connected_engine(&alice).await;

        // One remote row to pull, plus a trigger that rejects every
        // subsequent insert so the push phase fails after pull succeeds.
        let remote_id = crate::models::TaskId::new();
        {
            let remote = engine.remote.lock().await;
            let handle = remote.session_handle(&alice).unwrap();
            insert_remote_row(handle, &remote_id.as_str(), Some("From remote"), 50, None).await;
            handle
                .connection()
                .execute(
                    "CREATE TRIGGER reject_push BEFORE INSERT ON tasks
                     BEGIN SELECT RAISE(ABORT, 'push rejected'); END",
                    (),
                )
                .await
                .unwrap();
        }
        {
            let db = engine.db.lock().await;
            let repo = LibSqlTaskRepository::new(db.connection());
            repo.create(NewTask::new("Local pending", "2025-03-14".parse().unwrap()))
                .await
                .unwrap();
        }

        let error = engine.sync().await.unwrap_err();
        assert!(matches!(error, SyncError::Remote(_)));

        // The pulled row is durably in the local store despite the failure.
        let db = engine.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());
        let pulled = repo.get(&remote_id).await.unwrap().unwrap();
        assert_eq!(pulled.title, "From remote");
        assert_eq!(pulled.sync_status, SyncStatus::Synced);

        // And the local pending record was not marked.
        assert_eq!(repo.pending(&alice).await.unwrap().len(), 1);

        // The remote still only has its original row.
        let remote = engine.remote.lock().await;
        assert_eq!(remote_row_count(remote.session_handle(&alice).unwrap()).await, 1);
    }
}

//! Remote store connection management.

use std::future::Future;
use std::time::Duration;

use libsql::{Builder, Connection, Database as LibSqlDatabase, Rows, Transaction};
use tokio::time::{sleep, timeout};

use super::config::RemoteConfig;
use super::error::SyncError;
use crate::models::UserId;

/// An open connection to the remote store.
///
/// Every operation issued through the handle is bounded by the configured
/// per-query timeout; a timeout surfaces as [`SyncError::Timeout`] and is
/// treated like any other connection error by callers.
pub struct RemoteHandle {
    // Keeps the remote client alive for the connection's lifetime.
    _db: LibSqlDatabase,
    conn: Connection,
    query_timeout: Duration,
}

impl RemoteHandle {
    pub(crate) fn new(db: LibSqlDatabase, conn: Connection, query_timeout: Duration) -> Self {
        Self {
            _db: db,
            conn,
            query_timeout,
        }
    }

    /// Run a remote operation under the per-query timeout.
    pub(crate) async fn timed<T>(
        &self,
        what: &'static str,
        operation: impl Future<Output = std::result::Result<T, libsql::Error>>,
    ) -> Result<T, SyncError> {
        match timeout(self.query_timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(SyncError::Remote(error)),
            Err(_) => Err(SyncError::Timeout(what)),
        }
    }

    pub(crate) async fn query(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Rows, SyncError> {
        self.timed("remote query", self.conn.query(sql, params))
            .await
    }

    /// Open a transaction spanning an atomic push batch.
    pub(crate) async fn begin(&self) -> Result<Transaction, SyncError> {
        self.timed("remote transaction begin", self.conn.transaction())
            .await
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Owns the lifecycle of the single connection to the remote store.
pub struct RemoteConnectionManager {
    config: RemoteConfig,
    session: Option<RemoteSession>,
}

/// Ephemeral; exists only while connected, bound to one principal.
struct RemoteSession {
    principal: UserId,
    handle: RemoteHandle,
}

impl RemoteConnectionManager {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Attempt to open a connection for `principal`.
    ///
    /// Retries up to the configured number of attempts with exponential
    /// backoff between them. Never raises: terminal failure is reported
    /// as `false` with the cause logged. An already-open connection is
    /// closed first (a principal switch invalidates the previous session).
    pub async fn connect(&mut self, principal: &UserId) -> bool {
        self.disconnect();

        let max_attempts = self.config.retry.max_attempts;
        for attempt in 1..=max_attempts {
            match timeout(self.config.connect_timeout, self.open()).await {
                Ok(Ok(handle)) => {
                    tracing::info!(%principal, attempt, "connected to remote store");
                    self.session = Some(RemoteSession {
                        principal: principal.clone(),
                        handle,
                    });
                    return true;
                }
                Ok(Err(error)) => {
                    tracing::warn!(attempt, max_attempts, %error, "remote connect attempt failed");
                }
                Err(_) => {
                    tracing::warn!(attempt, max_attempts, "remote connect attempt timed out");
                }
            }

            if attempt < max_attempts {
                let delay = self.config.retry.delay_after(attempt);
                tracing::debug!(?delay, "waiting before next connect attempt");
                sleep(delay).await;
            }
        }

        tracing::error!(max_attempts, "failed to connect to remote store, giving up");
        false
    }

    async fn open(&self) -> std::result::Result<RemoteHandle, libsql::Error> {
        let db = Builder::new_remote(self.config.url.clone(), self.config.auth_token.clone())
            .build()
            .await?;
        let conn = db.connect()?;

        // Building the client does not touch the network; a probe query
        // makes a bad endpoint fail here, inside the retry loop.
        conn.query("SELECT 1", ()).await?;

        Ok(RemoteHandle::new(db, conn, self.config.query_timeout))
    }

    /// Close the connection if one is open. Idempotent.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("disconnected from remote store");
        }
    }

    /// Whether a connection is currently open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Handle of the open session, if it serves `principal`.
    ///
    /// A session opened for a different principal is unusable: the caller
    /// must reconnect after switching principals.
    pub(crate) fn session_handle(&self, principal: &UserId) -> Option<&RemoteHandle> {
        self.session
            .as_ref()
            .filter(|session| &session.principal == principal)
            .map(|session| &session.handle)
    }

    #[cfg(test)]
    pub(crate) fn attach_for_tests(&mut self, principal: UserId, handle: RemoteHandle) {
        self.session = Some(RemoteSession { principal, handle });
    }
}

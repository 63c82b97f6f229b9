//! Synchronization engine.
//!
//! Reconciles the local task store with a shared remote store using a
//! **pull-then-push** model:
//! 1. Pull remote records for the current principal and merge them
//!    locally (last-write-wins by `updated_at`; locally diverged records
//!    are left for push to adjudicate).
//! 2. Push locally pending records inside one atomic remote transaction,
//!    detecting per-record conflicts against the remote's timestamp.
//!
//! Key invariants:
//! - Pull always completes before push starts.
//! - At most one cycle runs at a time (single-flight; extra callers are
//!   dropped, not queued).
//! - A push batch commits entirely or not at all.
//! - The local store never silently loses an edit: a suppressed local
//!   edit is flagged `conflict`, not overwritten.

mod config;
mod cycle;
mod engine;
mod error;
mod remote;

pub use config::{RemoteConfig, RetryConfig};
pub use engine::{SyncEngine, SyncProgress, SyncResult};
pub use error::SyncError;
pub use remote::RemoteConnectionManager;

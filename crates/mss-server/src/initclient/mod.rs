//! Device-init reconciliation.
//!
//! An init call walks `ResolvingApp -> ReconcilingVersion -> ReconcilingDevice`
//! and projects the reconciled version into an [`mss_core::InitClient`]. Every
//! storage call of one init call shares a single deadline.
//!
//! Failures resolving the app or reconciling the version abort the call.
//! Device reconciliation failures are logged and the call still succeeds.

mod app_resolver;
mod device;
mod error;
mod service;
mod version;

use std::future::Future;

use mss_storage::StorageError;
use tokio::time::Instant;

pub use app_resolver::AppResolver;
pub use device::{DeviceChanges, DeviceOutcome, DeviceReconciler};
pub use error::{InitError, InitStage};
pub use service::InitService;
pub use version::VersionReconciler;

/// Runs a storage call, failing it with a timeout once `deadline` passes.
pub(crate) async fn within_deadline<T, F>(
    deadline: Instant,
    operation: &'static str,
    call: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::timeout(operation)),
    }
}

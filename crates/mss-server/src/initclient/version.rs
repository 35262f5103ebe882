use mss_core::Version;
use mss_storage::{DynRepository, Lookup, StorageError};
use tokio::time::Instant;

use super::{InitError, InitStage, within_deadline};

/// Records one launch of an app version, creating the version on first sight.
#[derive(Clone)]
pub struct VersionReconciler {
    repo: DynRepository,
}

impl VersionReconciler {
    pub fn new(repo: DynRepository) -> Self {
        Self { repo }
    }

    /// Fetches (or builds) the version, counts the launch and persists it with
    /// one atomic upsert. Returns the stored, post-increment row.
    ///
    /// `disabled` and `disabled_message` are never written here.
    pub async fn reconcile(
        &self,
        app_id: &str,
        version: &str,
        deadline: Instant,
    ) -> Result<Version, InitError> {
        let fail =
            |source: StorageError| InitError::internal(InitStage::ReconcilingVersion, source);

        let mut candidate = match within_deadline(
            deadline,
            "get_version",
            self.repo.get_version(app_id, version),
        )
        .await
        .map_err(fail)?
        {
            Lookup::Found(existing) => existing,
            Lookup::Absent => Version::new(app_id, version),
        };
        candidate.num_of_app_launches += 1;

        within_deadline(
            deadline,
            "upsert_version_launch",
            self.repo.upsert_version_launch(&candidate),
        )
        .await
        .map_err(fail)
    }
}

use mss_core::App;
use mss_storage::{DynRepository, Lookup};
use tokio::time::Instant;

use super::{InitError, InitStage, within_deadline};

/// Looks up the active app for an external app ID.
#[derive(Clone)]
pub struct AppResolver {
    repo: DynRepository,
}

impl AppResolver {
    pub fn new(repo: DynRepository) -> Self {
        Self { repo }
    }

    /// Returns the app if it is bound. Soft-deleted apps resolve to
    /// [`InitError::AppNotBound`], same as unknown ones.
    pub async fn resolve(&self, app_id: &str, deadline: Instant) -> Result<App, InitError> {
        match within_deadline(deadline, "get_app", self.repo.get_app(app_id)).await {
            Ok(Lookup::Found(app)) => Ok(app),
            Ok(Lookup::Absent) => Err(InitError::app_not_bound(app_id)),
            Err(source) => Err(InitError::internal(InitStage::ResolvingApp, source)),
        }
    }
}

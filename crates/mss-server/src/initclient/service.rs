use std::time::Duration;

use mss_core::{DeviceSnapshot, InitClient};
use mss_storage::DynRepository;
use tokio::time::Instant;
use tracing::{debug, error, field, instrument, warn};

use super::{AppResolver, DeviceReconciler, InitError, VersionReconciler};

/// Handles init calls: resolves the app, counts the launch, keeps the device
/// row current and answers with the version's enabled state.
#[derive(Clone)]
pub struct InitService {
    apps: AppResolver,
    versions: VersionReconciler,
    devices: DeviceReconciler,
    storage_timeout: Duration,
}

impl InitService {
    pub fn new(repo: DynRepository, storage_timeout: Duration) -> Self {
        Self {
            apps: AppResolver::new(repo.clone()),
            versions: VersionReconciler::new(repo.clone()),
            devices: DeviceReconciler::new(repo),
            storage_timeout,
        }
    }

    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    /// Runs an init call with the configured storage deadline.
    pub async fn init_client_app(
        &self,
        snapshot: &DeviceSnapshot,
    ) -> Result<InitClient, InitError> {
        self.init_client_app_until(snapshot, Instant::now() + self.storage_timeout)
            .await
    }

    /// Runs an init call whose storage work must finish before `deadline`.
    #[instrument(
        skip(self, snapshot),
        fields(app_id = %snapshot.app_id, version = %snapshot.version, device_id = %snapshot.device_id)
    )]
    pub async fn init_client_app_until(
        &self,
        snapshot: &DeviceSnapshot,
        deadline: Instant,
    ) -> Result<InitClient, InitError> {
        snapshot.validate()?;

        let app = self
            .apps
            .resolve(&snapshot.app_id, deadline)
            .await
            .inspect_err(|err| match err {
                InitError::AppNotBound { .. } => debug!("app is not bound"),
                other => error!(
                    error = %other,
                    category = other.storage_category().map(field::display),
                    "app lookup failed"
                ),
            })?;

        let version = self
            .versions
            .reconcile(&app.app_id, &snapshot.version, deadline)
            .await
            .inspect_err(|err| {
                error!(
                    error = %err,
                    category = err.storage_category().map(field::display),
                    "version reconciliation failed"
                )
            })?;

        let device = match self.devices.reconcile(snapshot, &version, deadline).await {
            Ok(outcome) => outcome.as_str(),
            Err(err) => {
                warn!(
                    error = %err,
                    category = err.storage_category().map(field::display),
                    "device reconciliation failed, continuing"
                );
                "failed"
            }
        };

        debug!(
            launches = version.num_of_app_launches,
            disabled = version.disabled,
            device,
            "init call completed"
        );

        Ok(InitClient::from(&version))
    }
}

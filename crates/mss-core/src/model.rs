//! Rows tracked by the service and the records exchanged with clients.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};
use crate::id::generate_id;

/// A mobile app bound to the service.
///
/// `app_id` is the stable external identifier (e.g. `com.example.app`); `id`
/// is the surrogate key. The app is bound while `deleted_at` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub app_id: String,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl App {
    pub fn new(app_id: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            app_id: app_id.into(),
            app_name: app_name.into(),
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A deployed version of an app, with its launch bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub version: String,
    pub app_id: String,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_message: Option<String>,
    pub num_of_current_installs: i64,
    pub num_of_app_launches: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_launched_at: Option<OffsetDateTime>,
}

impl Version {
    /// Builds a never-launched, enabled version with a fresh identity.
    pub fn new(app_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            version: version.into(),
            app_id: app_id.into(),
            disabled: false,
            disabled_message: None,
            num_of_current_installs: 0,
            num_of_app_launches: 0,
            last_launched_at: None,
        }
    }
}

/// A device that has launched some version of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    /// Points at `Version::id` of the version the device last reported.
    pub version_id: String,
    /// The version string reported alongside `version_id`.
    pub version: String,
    pub app_id: String,
    pub device_id: String,
    pub device_version: String,
    pub device_type: String,
}

impl Device {
    /// Builds a new device row for `snapshot` pointing at `version`.
    pub fn new(snapshot: &DeviceSnapshot, version: &Version) -> Self {
        Self {
            id: generate_id(),
            version_id: version.id.clone(),
            version: version.version.clone(),
            app_id: snapshot.app_id.clone(),
            device_id: snapshot.device_id.clone(),
            device_version: snapshot.device_version.clone(),
            device_type: snapshot.device_type.clone(),
        }
    }
}

/// What a client reports on every init call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub device_version: String,
    #[serde(default)]
    pub device_type: String,
}

impl DeviceSnapshot {
    /// Rejects snapshots missing any of the identifying fields.
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() || self.app_id.is_empty() || self.device_id.is_empty() {
            return Err(CoreError::invalid_init_request(
                "version, appId and deviceId fields can't be empty",
            ));
        }
        Ok(())
    }
}

/// The client-facing answer to an init call.
///
/// Only the version's identity and enabled state are exposed; launch counters
/// and device identifiers stay inside the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitClient {
    pub id: String,
    pub version: String,
    pub app_id: String,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_message: Option<String>,
}

impl From<&Version> for InitClient {
    fn from(version: &Version) -> Self {
        Self {
            id: version.id.clone(),
            version: version.version.clone(),
            app_id: version.app_id.clone(),
            disabled: version.disabled,
            disabled_message: version
                .disabled_message
                .clone()
                .filter(|message| !message.is_empty()),
        }
    }
}

use std::fmt;

use mss_api::ApiError;
use mss_core::CoreError;
use mss_storage::{ErrorCategory, StorageError};
use thiserror::Error;

/// Message returned to clients whose app is not bound (or was unbound).
pub const APP_NOT_BOUND_MESSAGE: &str = "No bound app found for the sent App ID";

/// Step of an init call that a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    ResolvingApp,
    ReconcilingVersion,
    ReconcilingDevice,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolvingApp => write!(f, "resolving app"),
            Self::ReconcilingVersion => write!(f, "reconciling version"),
            Self::ReconcilingDevice => write!(f, "reconciling device"),
        }
    }
}

/// Why an init call failed.
#[derive(Debug, Error)]
pub enum InitError {
    /// The device snapshot is missing identifying fields.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// No active app exists for the reported app ID.
    #[error("no bound app found for app id '{app_id}'")]
    AppNotBound { app_id: String },

    /// Storage failed (or ran out of time) during `stage`.
    #[error("{stage} failed: {source}")]
    Internal {
        stage: InitStage,
        #[source]
        source: StorageError,
    },
}

impl InitError {
    pub fn app_not_bound(app_id: impl Into<String>) -> Self {
        Self::AppNotBound {
            app_id: app_id.into(),
        }
    }

    pub fn internal(stage: InitStage, source: StorageError) -> Self {
        Self::Internal { stage, source }
    }

    /// Whether the client is responsible for the failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::AppNotBound { .. })
    }

    /// Category of the underlying storage failure, if there is one.
    pub fn storage_category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Internal { source, .. } => Some(source.category()),
            Self::Validation(_) | Self::AppNotBound { .. } => None,
        }
    }
}

impl From<InitError> for ApiError {
    fn from(err: InitError) -> Self {
        match err {
            InitError::Validation(CoreError::InvalidInitRequest(message)) => {
                ApiError::bad_request(message)
            }
            InitError::AppNotBound { .. } => ApiError::bad_request(APP_NOT_BOUND_MESSAGE),
            // Storage details stay in the logs
            InitError::Internal { .. } => {
                ApiError::internal("The server encountered an unexpected error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn client_errors_map_to_bad_request() {
        let api: ApiError = InitError::app_not_bound("com.example.app").into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(api.to_body().message, APP_NOT_BOUND_MESSAGE);
        assert_eq!(InitError::app_not_bound("x").storage_category(), None);

        let api: ApiError = InitError::from(CoreError::invalid_init_request(
            "version, appId and deviceId fields can't be empty",
        ))
        .into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            api.to_body().message,
            "version, appId and deviceId fields can't be empty"
        );
    }

    #[test]
    fn internal_errors_hide_storage_details() {
        let err = InitError::internal(
            InitStage::ReconcilingVersion,
            StorageError::connection_error("password authentication failed for user mss"),
        );
        assert!(!err.is_client_error());
        assert!(err.to_string().starts_with("reconciling version failed"));

        assert_eq!(err.storage_category(), Some(ErrorCategory::Infrastructure));

        let api: ApiError = err.into();
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.to_body().message.contains("password"));
    }

    #[test]
    fn timeouts_are_categorized() {
        let err = InitError::internal(
            InitStage::ReconcilingDevice,
            StorageError::timeout("upsert_device"),
        );
        assert_eq!(err.storage_category(), Some(ErrorCategory::Timeout));
        assert_eq!(
            err.storage_category().map(|c| c.to_string()).as_deref(),
            Some("timeout")
        );
    }
}

use thiserror::Error;

/// Core error types for mobile security service operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid init request: {0}")]
    InvalidInitRequest(String),
}

impl CoreError {
    /// Create a new InvalidInitRequest error
    pub fn invalid_init_request(message: impl Into<String>) -> Self {
        Self::InvalidInitRequest(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

use shared::error::{ApiError, ApiException, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// An operation was refused because its precondition does not hold:
    /// either checked locally before anything was sent, or reported by the
    /// server as `precondition_failed`.
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote operation failed: {0:#}")]
    Remote(#[from] anyhow::Error),
}

impl ClientError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err.code {
            ErrorCode::NotFound => Self::NotFound(err.message),
            ErrorCode::PreconditionFailed => Self::Precondition(err.message),
            _ => Self::Remote(ApiException::from(err).into()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.into())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

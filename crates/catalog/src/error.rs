use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failures the remote catalog can surface. Everything except
/// [`CatalogError::Unauthorized`] degrades a single lookup; unauthorized
/// latches the whole suggestion capability until retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog rejected the credentials")]
    Unauthorized,

    #[error("catalog feature unavailable: {0}")]
    NotFound(String),

    #[error("catalog fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("catalog network error: {0}")]
    Network(String),
}

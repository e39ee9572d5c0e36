//! Domain error taxonomy shared across the registry store, API surface,
//! scheduler and reconciler (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("insufficient privileges: {0}")]
    Ownership(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("empty input")]
    EmptyInput,

    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("storage consistency violation: {0}")]
    StorageConsistency(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::UpstreamFetch(_))
    }
}

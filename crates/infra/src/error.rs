//! Service-level error model.

use thiserror::Error;

use bss_core::DomainError;

use crate::store::StoreError;

/// Error returned by the ingestion, billing and document services.
///
/// Domain failures (including store lookups and compare-and-swap conflicts)
/// surface as [`ServiceError::Domain`]; only infrastructure faults use
/// [`ServiceError::Store`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store failure: {0}")]
    Store(StoreError),
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }

    /// True for stale-version and uniqueness conflicts.
    pub fn is_conflict(&self) -> bool {
        self.domain().is_some_and(DomainError::is_conflict)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(err) => ServiceError::Domain(err),
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

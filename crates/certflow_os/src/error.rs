#![forbid(unsafe_code)]

use certflow_kernel_contracts::ContractViolation;
use certflow_storage::store::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Internal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CertificationError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {reason}")]
    Validation { reason: String },
    #[error("conflict: {reason}")]
    Conflict { reason: String },
    #[error("role {role} is not permitted to {action}")]
    Forbidden { role: String, action: &'static str },
    #[error("internal store failure: {0}")]
    Internal(#[from] StorageError),
}

impl CertificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertificationError::NotFound { .. } => ErrorKind::NotFound,
            CertificationError::Validation { .. } => ErrorKind::Validation,
            CertificationError::Conflict { .. } => ErrorKind::Conflict,
            CertificationError::Forbidden { .. } => ErrorKind::Forbidden,
            CertificationError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        CertificationError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        CertificationError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        CertificationError::Conflict {
            reason: reason.into(),
        }
    }
}

impl From<ContractViolation> for CertificationError {
    fn from(v: ContractViolation) -> Self {
        CertificationError::Validation {
            reason: v.to_string(),
        }
    }
}

//! Service-level error taxonomy.

use thiserror::Error;

use bodega_auth::AuthzError;
use bodega_core::DomainError;

use crate::kv::KvError;
use crate::store::StoreError;

/// How a caller should react to a failed service call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input (or the caller's permissions) was wrong; show the message.
    Validation,
    /// The data changed underneath the caller; refresh and retry by hand.
    Conflict,
    /// Backend or storage failure.
    Failure,
}

/// Error returned by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: missing permission {0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Store(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Forbidden(_) => ErrorKind::Validation,
            Self::Conflict(_) | Self::NotFound(_) => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Failure,
        }
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::InsufficientStock { .. } => Self::Conflict(err.to_string()),
            DomainError::NotFound => Self::NotFound("record".to_string()),
            DomainError::Unauthorized => Self::Forbidden("unauthorized".to_string()),
            DomainError::InvariantViolation(msg) => Self::Store(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::not_found(entity, id),
            StoreError::InsufficientStock { .. } | StoreError::LotUnavailable { .. } => {
                Self::Conflict(err.to_string())
            }
            StoreError::Backend(_) | StoreError::Corrupt(_) => Self::Store(err.to_string()),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden(permission) => Self::Forbidden(permission),
        }
    }
}

impl From<KvError> for ServiceError {
    fn from(err: KvError) -> Self {
        Self::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::LotId;

    #[test]
    fn stale_state_maps_to_conflict() {
        let err: ServiceError = DomainError::conflict("adjustment 3 is already APPROVED").into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: ServiceError = StoreError::InsufficientStock {
            lot_id: LotId::new(1),
            requested: 5,
            available: 2,
        }
        .into();
        assert!(err.is_conflict());

        let err: ServiceError = StoreError::not_found("lot", LotId::new(9)).into();
        assert_eq!(err.to_string(), "lot 9 not found");
        assert!(err.is_conflict());
    }

    #[test]
    fn input_and_permission_problems_map_to_validation() {
        let err: ServiceError = DomainError::validation("quantity must be positive").into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: ServiceError = AuthzError::Forbidden("inventory.approve".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("inventory.approve"));
    }

    #[test]
    fn backend_failures_map_to_failure() {
        let err: ServiceError = StoreError::Backend("connection refused".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Failure);
    }
}

use std::collections::BTreeMap;

use sea_orm::DbErr;
use thiserror::Error;

/// Error kinds surfaced by the domain layer. The HTTP boundary maps each
/// variant to a status code; none are swallowed.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("voter has already voted on this feature request")]
    AlreadyVoted,

    #[error("feature request does not accept votes in its current state")]
    NotVotable,

    #[error("feature request does not accept comments")]
    NotCommentable,

    #[error("voter has reached the configured vote limit of {limit}")]
    LimitExceeded { limit: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), message.into());
        Self::Validation(fields)
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Translates a store-level unique violation into the domain kind the
/// caller expects. A concurrent first-time vote loses the race on the
/// (feature_request_id, voter_id) index and must not surface as a 500.
pub fn map_unique_violation(err: DbErr, on_conflict: DomainError) -> DomainError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => on_conflict,
        _ => DomainError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_carries_field_messages() {
        let err = DomainError::validation("title", "must not be empty");
        match err {
            DomainError::Validation(fields) => {
                assert_eq!(fields.get("title").map(String::as_str), Some("must not be empty"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn messages_are_renderable() {
        assert_eq!(
            DomainError::not_found("feature request 42").to_string(),
            "feature request 42 not found"
        );
        assert_eq!(
            DomainError::LimitExceeded { limit: 5 }.to_string(),
            "voter has reached the configured vote limit of 5"
        );
    }
}

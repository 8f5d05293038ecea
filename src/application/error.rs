use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

/// Outcome taxonomy of the banner engine.
#[derive(Debug, Error)]
pub enum BannerError {
    #[error("banner not found")]
    NotFound,
    #[error("banner with these tags and feature already exists")]
    Conflict,
    #[error("tag not found")]
    TagNotFound,
    #[error("feature not found")]
    FeatureNotFound,
    #[error("access to inactive banner is forbidden")]
    Forbidden,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("data integrity violated: {message}")]
    Integrity { message: String },
    #[error("operation deadline exceeded")]
    Cancelled,
    #[error("storage failure")]
    Store(#[source] RepoError),
}

/// Transport-agnostic classification consumed by outer layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Missing,
    Unauthorized,
    AccessDenied,
    Server,
}

impl BannerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BannerError::Conflict
            | BannerError::TagNotFound
            | BannerError::FeatureNotFound
            | BannerError::Invalid(_) => ErrorClass::Client,
            BannerError::NotFound => ErrorClass::Missing,
            BannerError::Unauthorized => ErrorClass::Unauthorized,
            BannerError::Forbidden => ErrorClass::AccessDenied,
            BannerError::Integrity { .. } | BannerError::Cancelled | BannerError::Store(_) => {
                ErrorClass::Server
            }
        }
    }
}

impl From<RepoError> for BannerError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => BannerError::NotFound,
            RepoError::Conflict => BannerError::Conflict,
            RepoError::MissingTag => BannerError::TagNotFound,
            RepoError::MissingFeature => BannerError::FeatureNotFound,
            RepoError::Integrity { message } => BannerError::Integrity { message },
            other @ (RepoError::Persistence(_) | RepoError::Timeout) => BannerError::Store(other),
        }
    }
}

impl From<DomainError> for BannerError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Inactive => BannerError::Forbidden,
            DomainError::Validation { message } => BannerError::Invalid(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Banner(#[from] BannerError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the command-line entry point.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Banner(error) => match error.class() {
                ErrorClass::Client => 2,
                ErrorClass::Missing => 3,
                ErrorClass::Unauthorized => 4,
                ErrorClass::AccessDenied => 5,
                ErrorClass::Server => 1,
            },
            AppError::Validation(_) => 2,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        AppError::Banner(BannerError::from(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_map_to_domain_outcomes() {
        assert!(matches!(
            BannerError::from(RepoError::Conflict),
            BannerError::Conflict
        ));
        assert!(matches!(
            BannerError::from(RepoError::MissingTag),
            BannerError::TagNotFound
        ));
        assert!(matches!(
            BannerError::from(RepoError::MissingFeature),
            BannerError::FeatureNotFound
        ));
        assert!(matches!(
            BannerError::from(RepoError::Timeout),
            BannerError::Store(RepoError::Timeout)
        ));
    }

    #[test]
    fn classes_follow_outcome_kind() {
        assert_eq!(BannerError::Conflict.class(), ErrorClass::Client);
        assert_eq!(BannerError::NotFound.class(), ErrorClass::Missing);
        assert_eq!(BannerError::Forbidden.class(), ErrorClass::AccessDenied);
        assert_eq!(
            BannerError::Store(RepoError::from_persistence("boom")).class(),
            ErrorClass::Server
        );
    }

    #[test]
    fn inactive_maps_to_forbidden() {
        assert!(matches!(
            BannerError::from(DomainError::Inactive),
            BannerError::Forbidden
        ));
    }
}

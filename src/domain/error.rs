use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("banner is inactive and hidden from non-admin callers")]
    Inactive,
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

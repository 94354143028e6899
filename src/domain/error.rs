use thiserror::Error;

/// Errors raised by domain validation rules.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("referenced {entity} does not exist")]
    MissingReference { entity: &'static str },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn missing_reference(entity: &'static str) -> Self {
        Self::MissingReference { entity }
    }
}

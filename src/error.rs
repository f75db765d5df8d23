//! Error types

use serde::Serialize;

use crate::models::ConfigError;
use crate::services::client::ClientError;
use crate::services::template::TemplateError;
use crate::services::validator::{ValidationIssue, ValidationResult};

/// Plugin error
#[derive(Debug, thiserror::Error)]
pub enum UnsendError {
    #[error("Invalid options for Unsend plugin: {}", .0.join("; "))]
    InvalidConfiguration(Vec<String>),
    #[error("Template with key \"{0}\" already exists")]
    DuplicateTemplate(String),
    #[error("Invalid template: {}", ValidationResult::summarize(.0))]
    InvalidTemplate(Vec<ValidationIssue>),
    #[error("Couldn't find an email template for {0}")]
    TemplateNotFound(String),
    #[error("Failed to render template {template}: {message}")]
    Render { template: String, message: String },
    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

/// Result type alias using UnsendError
pub type UnsendResult<T> = Result<T, UnsendError>;

impl From<TemplateError> for UnsendError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Duplicate(key) => Self::DuplicateTemplate(key),
            TemplateError::Invalid(issues) => Self::InvalidTemplate(issues),
        }
    }
}

impl From<ConfigError> for UnsendError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(violations) => Self::InvalidConfiguration(violations),
            other => Self::InvalidConfiguration(vec![other.to_string()]),
        }
    }
}

impl From<ClientError> for UnsendError {
    fn from(err: ClientError) -> Self {
        Self::SendFailed(err.to_string())
    }
}

/// Error kind understood by the host framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorKind {
    InvalidData,
}

/// Error surfaced to the host framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidData,
            message: message.into(),
        }
    }
}

impl From<UnsendError> for ProviderError {
    fn from(err: UnsendError) -> Self {
        Self::invalid_data(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_errors_are_invalid_data() {
        let errors = vec![
            UnsendError::InvalidConfiguration(vec!["a".to_string(), "b".to_string()]),
            UnsendError::DuplicateTemplate("welcome".to_string()),
            UnsendError::TemplateNotFound("welcome".to_string()),
            UnsendError::SendFailed("No data returned".to_string()),
        ];

        for err in errors {
            let provider: ProviderError = err.into();
            assert_eq!(provider.kind, ProviderErrorKind::InvalidData);
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            UnsendError::TemplateNotFound("order-placed".to_string()).to_string(),
            "Couldn't find an email template for order-placed"
        );
        assert_eq!(
            UnsendError::InvalidConfiguration(vec!["a".to_string(), "b".to_string()]).to_string(),
            "Invalid options for Unsend plugin: a; b"
        );
    }

    #[test]
    fn test_template_error_mapping() {
        let err: UnsendError = TemplateError::Duplicate("welcome".to_string()).into();
        assert!(matches!(err, UnsendError::DuplicateTemplate(ref k) if k == "welcome"));
    }
}

//! Error types for Escruta

use std::fmt;

use thiserror::Error;

/// Result type alias using Escruta's Error
pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected field in a request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.field, self.message)
    }
}

/// Escruta error types
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // Authentication errors (E100-E199)
    #[error("Bad credentials")]
    BadCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    // Input errors (E200-E299)
    #[error("Validation error in the submitted data.")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("{0}")]
    NoContent(String),

    // Ingestion errors (E300-E399)
    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    // Model provider errors (E400-E499)
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    // Database errors (E500-E599)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E001",
            Self::Conflict(_) => "E002",
            Self::BadCredentials => "E100",
            Self::Unauthorized(_) => "E101",
            Self::Forbidden(_) => "E102",
            Self::Validation(_) => "E200",
            Self::InvalidInput(_) => "E201",
            Self::UnsupportedFileType(_) => "E202",
            Self::NoContent(_) => "E203",
            Self::Ingestion(_) => "E300",
            Self::NetworkError(_) => "E400",
            Self::LLMError(_) => "E401",
            Self::RateLimited(_) => "E402",
            Self::EmbeddingFailed(_) => "E403",
            Self::DatabaseError(_) => "E500",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Human readable description shown next to the error detail
    pub fn description(&self) -> String {
        match self {
            Self::NotFound(_) => "The requested resource does not exist".to_string(),
            Self::Conflict(_) => "The resource already exists or is in use".to_string(),
            Self::BadCredentials => "The email or password is incorrect".to_string(),
            Self::Unauthorized(_) | Self::Forbidden(_) => {
                "You are not authorized to access this resource".to_string()
            }
            Self::Validation(fields) => fields
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Self::InvalidInput(_) | Self::UnsupportedFileType(_) | Self::NoContent(_) => {
                "The request body is invalid".to_string()
            }
            _ => "Unknown internal server error.".to_string(),
        }
    }

    /// Whether the error was caused by the server rather than the request
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Ingestion(_)
                | Self::NetworkError(_)
                | Self::LLMError(_)
                | Self::RateLimited(_)
                | Self::EmbeddingFailed(_)
                | Self::DatabaseError(_)
                | Self::ConfigError(_)
                | Self::Other(_)
                | Self::Io(_)
        )
    }

    /// True when a database error is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::DatabaseError(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_description_joins_fields() {
        let err = Error::Validation(vec![
            FieldError::new("email", "must be a well-formed email address"),
            FieldError::new("password", "size must be at least 8"),
        ]);

        assert_eq!(err.code(), "E200");
        assert_eq!(
            err.description(),
            "'email' must be a well-formed email address, 'password' size must be at least 8"
        );
        assert_eq!(err.to_string(), "Validation error in the submitted data.");
    }

    #[test]
    fn test_bad_credentials_description() {
        let err = Error::BadCredentials;
        assert_eq!(err.description(), "The email or password is incorrect");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_errors() {
        assert!(Error::LLMError("boom".into()).is_server_error());
        assert!(Error::Other("boom".into()).is_server_error());
        assert!(!Error::NotFound("Note".into()).is_server_error());
        assert_eq!(Error::NotFound("Note".into()).to_string(), "Note not found");
    }
}

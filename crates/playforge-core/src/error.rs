//! Error types for Playforge

use thiserror::Error;

/// Result type alias using Playforge's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Playforge error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (E100-E199)
    #[error("Invalid input: {0}")]
    Validation(String),

    // Entity errors (E200-E299)
    #[error("Project '{0}' not found. Run `playforge projects list` to see all projects.")]
    ProjectNotFound(String),

    #[error("Template '{0}' not found. Run `playforge templates list` to see all templates.")]
    TemplateNotFound(String),

    #[error("File '{0}' not found.")]
    FileNotFound(String),

    #[error("{0} not found.")]
    NotFound(String),

    // Conflict errors (E300-E399)
    #[error("A project named '{0}' already exists.")]
    Conflict(String),

    // Access errors (E400-E499)
    #[error("Access denied: '{0}' resolves outside of its root directory.")]
    PathTraversal(String),

    // Storage errors (E500-E599)
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Notifier errors (E600-E699)
    #[error("Email service is not configured: {0}")]
    NotifierConfig(String),

    #[error("Email service rejected the message: {0}")]
    NotifierRemote(String),

    #[error("Could not reach the email service: {0}. Check the server's network and firewall settings.")]
    NotifierNetwork(#[source] reqwest::Error),

    // Config errors (E700-E799)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E100",
            Self::ProjectNotFound(_) => "E200",
            Self::TemplateNotFound(_) => "E201",
            Self::FileNotFound(_) => "E202",
            Self::NotFound(_) => "E203",
            Self::Conflict(_) => "E300",
            Self::PathTraversal(_) => "E400",
            Self::Storage(_) => "E500",
            Self::DatabaseError(_) => "E501",
            Self::NotifierConfig(_) => "E600",
            Self::NotifierRemote(_) => "E601",
            Self::NotifierNetwork(_) => "E602",
            Self::ConfigError(_) => "E700",
            Self::Template(_) => "E701",
            Self::Other(_) => "E999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ProjectNotFound(_) => Some("playforge projects list".to_string()),
            Self::TemplateNotFound(_) => Some("playforge templates list".to_string()),
            Self::Conflict(_) => Some("Choose a different project name".to_string()),
            Self::NotifierConfig(_) => {
                Some("Set MAILCHIMP_API_KEY and SENDER_EMAIL_VERIFIED".to_string())
            }
            Self::NotifierNetwork(_) => Some("Check internet connection".to_string()),
            Self::ConfigError(_) => {
                Some("Fix the config file, or regenerate it with `playforge config init --force`".to_string())
            }
            _ => None,
        }
    }

    /// Build an invalid-data storage error, used for unparseable JSON documents
    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Self::Storage(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message.into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_not_found_error() {
        let error = Error::ProjectNotFound("my-project".to_string());
        assert_eq!(error.code(), "E200");
        assert_eq!(
            error.suggestion(),
            Some("playforge projects list".to_string())
        );
        assert!(error.to_string().contains("my-project"));
    }

    #[test]
    fn test_conflict_error() {
        let error = Error::Conflict("Quiz_1".to_string());
        assert_eq!(error.code(), "E300");
        assert!(error.to_string().contains("Quiz_1"));
    }

    #[test]
    fn test_path_traversal_has_no_suggestion() {
        let error = Error::PathTraversal("../etc/passwd".to_string());
        assert_eq!(error.code(), "E400");
        assert_eq!(error.suggestion(), None);
    }

    #[test]
    fn test_io_error_converts_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: Error = io.into();
        assert_eq!(error.code(), "E500");
        assert!(error.to_string().contains("denied"));
    }

    #[test]
    fn test_invalid_data_is_storage_error() {
        let error = Error::invalid_data("bad json");
        match error {
            Error::Storage(ref e) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

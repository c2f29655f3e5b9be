//! Error types for the agent runtime

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the agent runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider API error
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested skill does not exist or failed to load
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    /// A tool call's arguments did not match its schema
    #[error("Invalid tool arguments for {tool}: {reason}")]
    ToolArgumentsInvalid {
        /// Name of the tool whose arguments failed validation
        tool: String,
        /// Human-readable reason the arguments were rejected
        reason: String,
    },

    /// A drawing had no entities that contribute renderable bounds
    #[error("No renderable entities found in drawing")]
    NoRenderableEntities,

    /// A bounding box was malformed (e.g. min > max on an axis)
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimit(_) | Error::Timeout(_) | Error::Database(_)
        )
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::NotFound(_)
                | Error::Unauthorized(_)
                | Error::ToolArgumentsInvalid { .. }
                | Error::SkillNotFound(_)
                | Error::InvalidBbox(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors_are_classified_correctly() {
        assert!(Error::Timeout("slow".into()).is_retryable());
        assert!(!Error::InvalidInput("bad".into()).is_retryable());
    }

    #[test]
    fn client_errors_are_classified_correctly() {
        assert!(Error::SkillNotFound("cad-inspector".into()).is_client_error());
        assert!(!Error::Internal("boom".into()).is_client_error());
    }
}

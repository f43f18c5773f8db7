//! Error types for the GitDiagram engine.

use thiserror::Error;

use gitdiagram_keyring_store::KeyringError;
use gitdiagram_protocol::SubjectParseError;
use gitdiagram_storage::StorageError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, DiagramError>;

/// Main error type for the GitDiagram engine.
#[derive(Debug, Error)]
pub enum DiagramError {
    // Transport errors
    #[error("Failed to start streaming: {0}")]
    StreamOpen(String),

    #[error("Failed to start streaming (HTTP {status})")]
    StreamRejected { status: u16 },

    #[error("Stream read failed: {0}")]
    StreamRead(String),

    #[error("Stream ended before generation completed")]
    StreamClosed,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    // Server-reported errors, kept verbatim
    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Estimate(String),

    // Rejected user actions
    #[error("Example repository {subject} cannot be modified or regenerated")]
    ReadOnlySubject { subject: String },

    #[error("Instructions are {len} characters long; the maximum is {max}")]
    InstructionsTooLong { len: usize, max: usize },

    #[error("API key cannot be empty")]
    EmptyApiKey,

    #[error("Invalid repository: {0}")]
    InvalidSubject(#[from] SubjectParseError),

    // Collaborator errors
    #[error("Cache error: {0}")]
    Cache(#[from] StorageError),

    #[error("Credential storage error: {0}")]
    Credentials(#[from] KeyringError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Generic errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generation cancelled")]
    Cancelled,
}

impl DiagramError {
    /// Failures of the stream transport itself, as opposed to errors the
    /// server reported in-band.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::StreamOpen(_)
                | Self::StreamRejected { .. }
                | Self::StreamRead(_)
                | Self::StreamClosed
                | Self::Network(_)
                | Self::HttpStatus { .. }
        )
    }

    /// Whether the user should be asked for their own API key.
    pub fn requires_api_key(&self) -> bool {
        match self {
            Self::Protocol(message) | Self::Estimate(message) => mentions_api_key(message),
            _ => false,
        }
    }
}

/// Server messages that ask for a key mention it by name.
pub(crate) fn mentions_api_key(message: &str) -> bool {
    message.contains("API key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(DiagramError::StreamOpen("refused".into()).is_transport_error());
        assert!(DiagramError::StreamRejected { status: 502 }.is_transport_error());
        assert!(DiagramError::StreamClosed.is_transport_error());
        assert!(!DiagramError::Protocol("boom".into()).is_transport_error());
        assert!(!DiagramError::Cancelled.is_transport_error());
    }

    #[test]
    fn test_requires_api_key() {
        let err = DiagramError::Estimate("Please provide an API key to continue".into());
        assert!(err.requires_api_key());
        assert!(!DiagramError::Protocol("Repository not found".into()).requires_api_key());
        // Transport errors never ask for a key, whatever their text says.
        assert!(!DiagramError::StreamOpen("API key".into()).requires_api_key());
    }

    #[test]
    fn test_server_messages_are_verbatim() {
        let err = DiagramError::Protocol("Rate limit reached".into());
        assert_eq!(err.to_string(), "Rate limit reached");
    }
}

//! Error types for native project mutation

use thiserror::Error;

use crate::artifact::ArtifactKind;

/// Errors that can occur while mutating native artifacts
#[derive(Debug, Error)]
pub enum InjectError {
    /// Anchor pattern couldn't be compiled
    #[error("Invalid anchor pattern: '{pattern}'\n  Parse error: {parse_error}")]
    InvalidAnchor { pattern: String, parse_error: String },

    /// Artifact was never loaded into the configuration
    #[error("Artifact not loaded: {kind}")]
    MissingArtifact { kind: ArtifactKind },

    /// Artifact is held in a different representation than the stage expects
    #[error("Artifact {kind} is not a {expected}")]
    WrongRepresentation {
        kind: ArtifactKind,
        expected: &'static str,
    },

    /// Tree doesn't have the structure a mutator relies on
    #[error("Malformed tree at '{}': {reason}", path.join("."))]
    MalformedTree { path: Vec<String>, reason: String },

    /// A pipeline stage failed
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<InjectError>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl InjectError {
    pub(crate) fn malformed(path: &[&str], reason: impl Into<String>) -> Self {
        InjectError::MalformedTree {
            path: path.iter().map(|s| s.to_string()).collect(),
            reason: reason.into(),
        }
    }
}

/// Result type for mutation operations
pub type Result<T> = std::result::Result<T, InjectError>;

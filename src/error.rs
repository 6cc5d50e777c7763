//! Error types for gistup

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gistup
///
/// Every variant is fatal to a run except [`GistupError::OperationUnauthorized`],
/// which the upload loop recovers from exactly once by re-authenticating.
#[derive(Error, Debug)]
pub enum GistupError {
    /// Invalid configuration (bad base URL, unresolvable config directory, bad settings file)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The user interrupted the credential prompt
    #[error("Credential prompt cancelled")]
    PromptCancelled,

    /// Terminal I/O failed while prompting for credentials
    #[error("Could not read credentials from terminal: {0}")]
    PromptIo(#[source] std::io::Error),

    /// The authorization endpoint rejected the credentials or returned garbage
    #[error("Authentication failed (status {status}): {message}")]
    Auth {
        /// HTTP status returned by the authorization endpoint
        status: u16,
        /// Server message or parse failure
        message: String,
    },

    /// Transport failure while talking to the authorization endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// The token file could not be read, written or removed
    #[error("Token file {path}: {source}")]
    Persistence {
        /// Path of the token file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The snippet endpoint answered 401 Unauthorized
    #[error("Unauthorized: {0}")]
    OperationUnauthorized(String),

    /// Any other snippet endpoint failure
    #[error("{0}")]
    Operation(String),

    /// A network call was aborted by an interrupt signal
    #[error("Interrupted")]
    Interrupted,

    /// An input file could not be read
    #[error("{path}: {source}")]
    Input {
        /// File that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for gistup operations
pub type Result<T> = std::result::Result<T, GistupError>;

impl GistupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(status: u16, msg: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: msg.into(),
        }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a persistence error for the given token path
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Create an operation error
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an input error
    pub fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was caused by the user interrupting the run
    #[must_use]
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::PromptCancelled | Self::Interrupted)
    }

    /// Whether this error allows a single re-authentication cycle
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::OperationUnauthorized(_))
    }
}

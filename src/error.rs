//! Error types for the career assistant client.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to the remote conversation service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response body from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl ApiError {
    /// Whether the server answered with 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Local checks that fail before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("Message is empty")]
    BlankInput,

    #[error("No active conversation")]
    NoActiveConversation,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

use std::error::Error as StdError;

use thiserror::Error;

/// Lanturn's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Lanturn's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
///
/// Note that some terminal conditions are deliberately *not* errors: idle-timeout expiry
/// and task cancellation are normal ways for a connection to end and are reported through
/// `task::TaskExit` instead.
#[derive(Debug, Error)]
pub enum Error {
    /// No model API credential was found in the environment.
    ///
    /// Raised at startup, before any transport is constructed.
    #[error("missing credential: set {0} (or GOOGLE_API_KEY) in the environment")]
    MissingCredential(&'static str),

    /// A configuration value was present but could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The requested transport kind is not supported by the selected bot variant.
    #[error("unsupported transport kind: {0}")]
    UnsupportedTransport(String),

    /// A transport-level failure (connection handling, frame delivery).
    #[error("transport error: {0}")]
    Transport(String),

    /// A model-session failure surfaced mid-stream.
    #[error("session error: {0}")]
    Session(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

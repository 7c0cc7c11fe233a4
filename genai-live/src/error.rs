use thiserror::Error;

/// Errors produced by live sessions.
///
/// Send operations only fail synchronously, with
/// [`Error::InvalidArgument`] or [`Error::InvalidState`]; socket-level
/// failures surface through the handler callbacks instead, because
/// sends are fire-and-forget.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("failed to serialize client message")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

impl Error {
    pub(crate) fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

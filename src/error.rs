use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures before the conversation starts. Nothing is left to unwind.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("dial error: {0}")]
    Dial(#[source] tungstenite::Error),
}

/// Failures on an established connection. Every one of them ends the
/// conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("write error: {0}")]
    Write(String),

    #[error("read error: {0}")]
    Read(String),

    /// Normal closure: remote sent 1000 (or no code), the stream ended, or we
    /// closed it ourselves.
    #[error("connection closed")]
    Closed,

    #[error("connection closed with code {code}: {reason}")]
    ClosedWith { code: u16, reason: String },
}

impl TransportError {
    pub fn is_normal_closure(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

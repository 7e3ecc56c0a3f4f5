use zkplay_abi::SchemaError;

use crate::message::RequestKind;

/// A failure reported by the engine while compiling or computing.
///
/// Travels back to the caller as an `error` response, never as a panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
        }
    }
}

/// Errors on the channel between the client and the engine worker.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The worker is gone: the session ended or the engine failed to start.
    #[error("engine channel closed")]
    Closed,

    /// The worker thread could not be started.
    #[error("failed to start engine worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A request of this kind is still outstanding.
    #[error("a {0} request is already in flight")]
    Busy(RequestKind),

    /// Compute was requested before any successful compile.
    #[error("no compiled program to run")]
    NoArtifacts,

    #[error("unknown input '{0}'")]
    UnknownInput(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

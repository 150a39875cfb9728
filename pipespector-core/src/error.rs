use thiserror::Error;

/// Operator commands that are rejected without changing any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidCommand {
    #[error("Pipe is already open")]
    AlreadyOpen,
    #[error("Pipe is already closed")]
    AlreadyClosed,
    #[error("Pipe is open; close it first")]
    PipeOpen,
    #[error("Pipe is closing; it pauses once the in-flight unit arrives")]
    Closing,
}

/// The scripting hook failed to produce a value. Slots stay untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MutationError {
    pub message: String,
}

impl MutationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Terminal lifecycle event, not a pipeline failure.
    #[error("No more items left in upstream")]
    UpstreamExhausted,

    #[error(transparent)]
    InvalidCommand(#[from] InvalidCommand),

    #[error("Mutation failed: {0}")]
    Mutation(#[from] MutationError),

    #[error("Upstream read failed: {0}")]
    Upstream(#[source] std::io::Error),

    #[error("Downstream write failed: {0}")]
    Downstream(#[source] std::io::Error),

    /// The pipe was lost because a worker died mid-operation.
    #[error("Pipe worker terminated unexpectedly")]
    WorkerLost,
}

impl EngineError {
    /// Whether the session can no longer make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineError::UpstreamExhausted
                | EngineError::Upstream(_)
                | EngineError::Downstream(_)
                | EngineError::WorkerLost
        )
    }
}

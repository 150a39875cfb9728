use pipespector_core::{MutationError, SlotName};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    #[error("nothing to execute")]
    Empty,

    #[error("unknown slot '{0}' (expected curr or prev)")]
    UnknownSlot(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{0} is empty")]
    EmptySlot(SlotName),

    #[error("invalid regex: {0}")]
    InvalidRegex(String),
}

impl ScriptError {
    pub(crate) fn syntax(column: usize, message: impl Into<String>) -> Self {
        ScriptError::Syntax {
            column,
            message: message.into(),
        }
    }
}

impl From<ScriptError> for MutationError {
    fn from(err: ScriptError) -> Self {
        MutationError::new(err.to_string())
    }
}

//! # Pipespector Core
//!
//! The pipe-streaming engine behind the inspection point: a cursor over the
//! incoming units, glob breakpoints, and the background forwarding loop that
//! pumps units from upstream to downstream until it is paused.

pub mod breakpoint;
pub mod cursor;
pub mod engine;
pub mod error;
mod forwarder;
pub mod mutation;
pub mod pipe;
pub mod state_machine;
pub mod unit;

// Re-export the main struct so users can just use `pipespector_core::PipeEngine`
pub use engine::PipeEngine;

pub use breakpoint::{Breakpoint, BreakpointSet};
pub use error::{EngineError, InvalidCommand, MutationError};
pub use mutation::{Mutator, SlotName};
pub use pipe::{Sink, Source, Step};
pub use state_machine::FlowState;
pub use unit::Unit;

use serde::{Deserialize, Serialize};

/// Session options recognized at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shown in the console prompt and in `info`.
    pub name: String,
    /// Raw byte units instead of text lines.
    pub binary: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "pipespector".to_string(),
            binary: false,
        }
    }
}

/// What the forwarding loop (or a manual step) reports to the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A newly pulled unit matched `pattern`; it sits un-forwarded in `current`.
    BreakpointHit {
        sequence: u64,
        pattern: String,
        unit: Unit,
    },
    /// The loop honoured a close request.
    Paused { sequence: u64 },
    /// Upstream has no more units. The session is over.
    Exhausted { sequence: u64 },
    /// Upstream or downstream broke. The session is over.
    Failed { sequence: u64, message: String },
}

impl StreamEvent {
    /// Events after which the process must shut down.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Exhausted { .. } | StreamEvent::Failed { .. }
        )
    }

    pub fn sequence(&self) -> u64 {
        match self {
            StreamEvent::BreakpointHit { sequence, .. }
            | StreamEvent::Paused { sequence }
            | StreamEvent::Exhausted { sequence }
            | StreamEvent::Failed { sequence, .. } => *sequence,
        }
    }
}

/// Point-in-time view of the session, backing the console's `info`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub flow_state: FlowState,
    pub sequence: u64,
    /// Only populated while the pipe is closed.
    pub current: Option<Unit>,
    pub previous: Option<Unit>,
    pub patterns: Vec<String>,
}

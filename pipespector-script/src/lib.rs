//! # Pipespector Script
//!
//! A tiny assignment language for rewriting the inspection slots from the
//! console's `exec` command:
//!
//! ```text
//! curr = prev + b"\n"
//! curr = sub(curr, "password=\\S+", "password=***"); prev = upper(prev)
//! ```
//!
//! Values are bytes. Slots are `curr`/`current` and `prev`/`previous`;
//! functions are `upper`, `lower`, `trim` and `sub(value, regex, replacement)`.

mod ast;
pub mod error;
mod lexer;
mod parser;

pub use ast::{Assignment, Expr, Function};
pub use error::ScriptError;

use pipespector_core::{EngineError, PipeEngine, SlotName, Unit};

/// A parsed `exec` program: one or more assignments run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    assignments: Vec<Assignment>,
}

impl Script {
    pub fn parse(src: &str) -> Result<Self, ScriptError> {
        let assignments = parser::parse(src)?;
        Ok(Self { assignments })
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Apply every assignment through the engine's mutation hook.
    ///
    /// Each assignment is atomic. The first failure stops the script;
    /// assignments before it stay applied.
    pub async fn execute(&self, engine: &mut PipeEngine) -> Result<Vec<(SlotName, Unit)>, EngineError> {
        let mut applied = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            let slot = assignment.target();
            let unit = engine.apply(slot, assignment).await?;
            tracing::debug!(%slot, len = unit.len(), "slot rewritten");
            applied.push((slot, unit));
        }
        Ok(applied)
    }
}

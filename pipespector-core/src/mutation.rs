//! The mutation capability.
//!
//! The engine does not know any expression language. Whoever wants to
//! rewrite a slot supplies a `Mutator`, which sees both slots and returns
//! the replacement value (or an error, in which case nothing changes).

use crate::error::MutationError;
use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotName {
    Current,
    Previous,
}

impl SlotName {
    /// Accepts the long names and the console's short aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "curr" | "current" => Some(SlotName::Current),
            "prev" | "previous" => Some(SlotName::Previous),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Current => "current",
            SlotName::Previous => "previous",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Mutator {
    fn apply(
        &self,
        slot: SlotName,
        current: Option<&Unit>,
        previous: Option<&Unit>,
    ) -> Result<Unit, MutationError>;
}

impl<F> Mutator for F
where
    F: Fn(SlotName, Option<&Unit>, Option<&Unit>) -> Result<Unit, MutationError>,
{
    fn apply(
        &self,
        slot: SlotName,
        current: Option<&Unit>,
        previous: Option<&Unit>,
    ) -> Result<Unit, MutationError> {
        self(slot, current, previous)
    }
}

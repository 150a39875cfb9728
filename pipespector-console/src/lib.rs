//! # Pipespector Console
//!
//! The operator side of the inspection point: console commands, the runner
//! that maps them onto the engine, and the control loop that interleaves
//! operator input with events from the forwarding loop.

pub mod app;
pub mod console;
pub mod util;

pub use app::{App, Outcome};
pub use console::parser::{BreakCommand, Command, CommandParser};
pub use console::runner::{Endpoints, ExecuteResult, Runner};

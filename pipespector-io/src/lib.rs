//! # Pipespector IO
//!
//! The byte-level edges of the inspection point: framing upstream bytes into
//! units, writing units downstream, and the separate console device the
//! operator types into.

pub mod device;
pub mod framing;
pub mod render;
pub mod sink;
pub mod tty;

pub use device::{ConsoleDevice, ConsoleWriter, DEFAULT_CONSOLE, spawn_line_reader};
pub use framing::{Framing, LineSource};
pub use sink::WriterSink;

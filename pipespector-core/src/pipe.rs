//! Upstream / downstream abstractions.
//!
//! The engine only needs "pull the next framed unit" and "write a unit".
//! Framing of real byte streams lives in `pipespector-io`; the in-memory
//! implementations here are what the engine's own tests (and embedders)
//! plug in.

use crate::cursor::Cursor;
use crate::error::EngineError;
use crate::unit::Unit;

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, mpsc};

/// The upstream producer.
pub trait Source: Send {
    /// Blocks until the next unit is available.
    /// `Ok(None)` means upstream is exhausted.
    fn pull(&mut self) -> io::Result<Option<Unit>>;
}

/// The downstream consumer.
pub trait Sink: Send {
    fn forward(&mut self, unit: &Unit) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Source for VecDeque<Unit> {
    fn pull(&mut self) -> io::Result<Option<Unit>> {
        Ok(self.pop_front())
    }
}

/// A channel receiver blocks like a quiet pipe; dropping every sender ends the stream.
impl Source for mpsc::Receiver<Unit> {
    fn pull(&mut self) -> io::Result<Option<Unit>> {
        Ok(self.recv().ok())
    }
}

impl Source for Box<dyn Source> {
    fn pull(&mut self) -> io::Result<Option<Unit>> {
        (**self).pull()
    }
}

impl Sink for Arc<Mutex<Vec<Unit>>> {
    fn forward(&mut self, unit: &Unit) -> io::Result<()> {
        let mut captured = self
            .lock()
            .map_err(|_| io::Error::other("capture sink poisoned"))?;
        captured.push(unit.clone());
        Ok(())
    }
}

impl Sink for Box<dyn Sink> {
    fn forward(&mut self, unit: &Unit) -> io::Result<()> {
        (**self).forward(unit)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Result of a manual single-unit advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `current` was empty; this unit was pulled into it and not forwarded.
    Pulled(Unit),
    /// `current` was forwarded downstream and moved into `previous`.
    Forwarded(Unit),
}

/// The cursor plus the sink it feeds. This is the unit of ownership that
/// moves between the engine (pipe closed) and the forwarding loop (pipe open).
pub struct Pipe {
    pub cursor: Cursor,
    sink: Box<dyn Sink>,
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("cursor", &self.cursor)
            .field("sink", &"Box<dyn Sink>")
            .finish()
    }
}

impl Pipe {
    pub fn new(cursor: Cursor, sink: impl Sink + 'static) -> Self {
        Self {
            cursor,
            sink: Box::new(sink),
        }
    }

    /// Write `current` downstream (if any) and flush it into `previous`.
    pub fn forward_current(&mut self) -> Result<Option<Unit>, EngineError> {
        let Some(unit) = self.cursor.read_current().cloned() else {
            return Ok(None);
        };

        self.sink.forward(&unit).map_err(EngineError::Downstream)?;
        self.cursor.flush();
        tracing::debug!(len = unit.len(), "forwarded unit");
        Ok(Some(unit))
    }

    /// Empty `current` pulls one unit; populated `current` is forwarded.
    pub fn step(&mut self) -> Result<Step, EngineError> {
        match self.forward_current()? {
            Some(unit) => Ok(Step::Forwarded(unit)),
            None => {
                let unit = self.cursor.advance()?.clone();
                Ok(Step::Pulled(unit))
            }
        }
    }

    pub fn flush_sink(&mut self) -> Result<(), EngineError> {
        self.sink.flush().map_err(EngineError::Downstream)
    }
}

use pipespector_core::{Sink, Unit};
use std::io::{self, Write};

/// Writes each unit verbatim and flushes right away, so the consumer sees
/// values as soon as they are let through.
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn forward(&mut self, unit: &Unit) -> io::Result<()> {
        self.writer.write_all(unit.as_bytes())?;
        self.writer.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl WriterSink<io::Stdout> {
    /// The process's own stdout, the default downstream.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

//! The operator console device.
//!
//! stdin/stdout carry the data stream, so the operator talks to the tool
//! over a separate line device (the controlling terminal by default).

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub const DEFAULT_CONSOLE: &str = "/dev/tty";

#[derive(Debug)]
pub struct ConsoleDevice {
    path: PathBuf,
    input: File,
    output: File,
}

impl ConsoleDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let input = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("Failed to open console {} for reading", path.display()))?;
        let output = OpenOptions::new()
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open console {} for writing", path.display()))?;

        Ok(Self {
            path,
            input,
            output,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split into the operator's line stream and the console writer.
    pub fn start(self) -> (mpsc::Receiver<String>, ConsoleWriter<File>) {
        let lines = spawn_line_reader(BufReader::new(self.input));
        (lines, ConsoleWriter::new(self.output))
    }
}

/// Read lines on a dedicated thread and hand them over a channel.
/// The channel closes when the reader hits EOF or an error.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(32);

    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "console read failed");
                    break;
                }
            }
        }
        tracing::debug!("console reader ended");
    });

    rx
}

/// Everything the console prints goes through here.
pub struct ConsoleWriter<W> {
    out: W,
}

impl<W: Write> ConsoleWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

use pipespector_core::{Source, Unit};
use std::io::{self, BufRead};

/// How units are shown to the operator. Both framings cut upstream at
/// newlines and forward the bytes untouched; only the console view differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Units print as text. Invalid UTF-8 is replaced on screen only.
    Text,
    /// Units print as escaped byte strings.
    Binary,
}

impl Framing {
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary { Framing::Binary } else { Framing::Text }
    }
}

/// Pulls one line (terminator included) per unit from a buffered reader.
/// The final line may lack a terminator.
/// Units hold the raw bytes, so what goes downstream is exactly what came in.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
        }
    }
}

impl<R: BufRead + Send> Source for LineSource<R> {
    fn pull(&mut self) -> io::Result<Option<Unit>> {
        self.buf.clear();
        let n = loop {
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            return Ok(None);
        }

        Ok(Some(Unit::from(self.buf.as_slice())))
    }
}

impl LineSource<io::BufReader<io::Stdin>> {
    /// The process's own stdin, the default upstream. A stdin lock is not
    /// `Send`, so the handle itself is buffered instead.
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

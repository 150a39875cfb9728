//! The stream cursor: the inspection slots over the incoming sequence.
//!
//! Only whoever owns the `Cursor` can touch its slots. The engine hands it
//! to the forwarding loop on `open` and gets it back when the loop stops,
//! so slot access never races. The sequence counter is the one piece read
//! from both sides and is therefore atomic.

use crate::error::EngineError;
use crate::mutation::SlotName;
use crate::pipe::Source;
use crate::unit::Unit;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Cursor {
    source: Box<dyn Source>,
    current: Option<Unit>,
    previous: Option<Unit>,
    sequence: Arc<AtomicU64>,
    exhausted: bool,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("sequence", &self.sequence())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl Cursor {
    pub fn new(source: impl Source + 'static) -> Self {
        Self {
            source: Box::new(source),
            current: None,
            previous: None,
            sequence: Arc::new(AtomicU64::new(0)),
            exhausted: false,
        }
    }

    /// Shared handle on the pull counter, readable while the cursor is away.
    pub fn sequence_counter(&self) -> Arc<AtomicU64> {
        self.sequence.clone()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next unit from upstream. Bumps `sequence` by exactly one on success.
    ///
    /// Exhaustion is sticky: once seen, every later call fails the same way
    /// without touching the source again.
    pub fn pull(&mut self) -> Result<Unit, EngineError> {
        if self.exhausted {
            return Err(EngineError::UpstreamExhausted);
        }

        match self.source.pull() {
            Ok(Some(unit)) => {
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::trace!(seq, len = unit.len(), "pulled unit");
                Ok(unit)
            }
            Ok(None) => {
                self.exhausted = true;
                tracing::info!(seq = self.sequence(), "upstream exhausted");
                Err(EngineError::UpstreamExhausted)
            }
            Err(e) => {
                self.exhausted = true;
                tracing::warn!(error = %e, "upstream read failed");
                Err(EngineError::Upstream(e))
            }
        }
    }

    /// Pull the next unit into `current`, flushing any resident unit first.
    pub fn advance(&mut self) -> Result<&Unit, EngineError> {
        self.flush();
        let unit = self.pull()?;
        Ok(self.current.insert(unit))
    }

    /// Move `current` into `previous` and empty `current`.
    ///
    /// An empty `current` leaves `previous` alone, so `previous` always
    /// names the last unit that actually sat in the inspection slot.
    pub fn flush(&mut self) -> Option<&Unit> {
        if let Some(unit) = self.current.take() {
            self.previous = Some(unit);
        }
        self.previous.as_ref()
    }

    /// Opaque replacement of a slot.
    pub fn mutate(&mut self, slot: SlotName, unit: Unit) {
        match slot {
            SlotName::Current => self.current = Some(unit),
            SlotName::Previous => self.previous = Some(unit),
        }
    }

    pub fn read_current(&self) -> Option<&Unit> {
        self.current.as_ref()
    }

    pub fn read_previous(&self) -> Option<&Unit> {
        self.previous.as_ref()
    }
}

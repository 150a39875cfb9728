//! The forwarding loop.
//!
//! Runs on a blocking worker (the upstream pull may block forever) and owns
//! the `Pipe` for its whole lifetime. It hands the pipe back by returning it.
//!
//! Per iteration:
//! 1. forward the unit resident in `current`, if any, and flush it to `previous`
//!    (resident units are never re-checked against breakpoints);
//! 2. pull the next unit into `current`;
//! 3. stop if it matches a breakpoint, leaving it un-forwarded;
//! 4. stop if a close was requested, leaving it un-forwarded;
//! 5. repeat.

use crate::StreamEvent;
use crate::breakpoint::BreakpointSet;
use crate::error::EngineError;
use crate::pipe::Pipe;
use crate::state_machine::{FlowControl, StopReason};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};

pub(crate) struct ForwardingLoop {
    pipe: Pipe,
    flow: FlowControl,
    breakpoints: watch::Receiver<BreakpointSet>,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl ForwardingLoop {
    pub(crate) fn new(
        pipe: Pipe,
        flow: FlowControl,
        breakpoints: watch::Receiver<BreakpointSet>,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> Self {
        Self {
            pipe,
            flow,
            breakpoints,
            events,
        }
    }

    /// Pump until something stops us, then report why and give the pipe back.
    pub(crate) fn run(mut self) -> Pipe {
        tracing::info!(seq = self.pipe.cursor.sequence(), "forwarding loop started");
        let _panic_report = PanicReport {
            flow: self.flow.clone(),
            events: self.events.clone(),
            sequence: self.pipe.cursor.sequence_counter(),
        };

        let reason = self.pump();
        if let Err(e) = self.pipe.flush_sink() {
            tracing::warn!(error = %e, "downstream flush failed");
        }

        let sequence = self.pipe.cursor.sequence();
        tracing::info!(seq = sequence, ?reason, "forwarding loop stopped");

        // Flip the flag before reporting, so whoever reacts to the event
        // already sees the pipe as closed.
        self.flow.stop();

        let event = match reason {
            StopReason::Breakpoint { pattern } => StreamEvent::BreakpointHit {
                sequence,
                pattern,
                unit: self.pipe.cursor.read_current().cloned().unwrap_or_default(),
            },
            StopReason::CloseRequested => StreamEvent::Paused { sequence },
            StopReason::Exhausted => StreamEvent::Exhausted { sequence },
            StopReason::Failed(message) => StreamEvent::Failed { sequence, message },
        };
        let _ = self.events.send(event);

        self.pipe
    }

    fn pump(&mut self) -> StopReason {
        loop {
            if let Err(e) = self.pipe.forward_current() {
                return StopReason::Failed(e.to_string());
            }

            let unit = match self.pipe.cursor.advance() {
                Ok(unit) => unit,
                Err(EngineError::UpstreamExhausted) => return StopReason::Exhausted,
                Err(e) => return StopReason::Failed(e.to_string()),
            };

            if let Some(bp) = self.breakpoints.borrow().first_match(unit) {
                return StopReason::Breakpoint {
                    pattern: bp.pattern().to_string(),
                };
            }

            if self.flow.close_requested() {
                return StopReason::CloseRequested;
            }
        }
    }
}

/// Closes the flow and reports a failure if the loop unwinds, so the console
/// is not left waiting on a worker that will never hand the pipe back.
struct PanicReport {
    flow: FlowControl,
    events: mpsc::UnboundedSender<StreamEvent>,
    sequence: Arc<AtomicU64>,
}

impl Drop for PanicReport {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let sequence = self.sequence.load(Ordering::SeqCst);
        tracing::error!(seq = sequence, "forwarding loop panicked");
        self.flow.stop();
        let _ = self.events.send(StreamEvent::Failed {
            sequence,
            message: EngineError::WorkerLost.to_string(),
        });
    }
}

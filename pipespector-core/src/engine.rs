use crate::breakpoint::BreakpointSet;
use crate::cursor::Cursor;
use crate::error::{EngineError, InvalidCommand};
use crate::forwarder::ForwardingLoop;
use crate::mutation::{Mutator, SlotName};
use crate::pipe::{Pipe, Sink, Source, Step};
use crate::state_machine::{FlowControl, FlowState};
use crate::unit::Unit;
use crate::{SessionConfig, Snapshot, StreamEvent};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Where the pipe currently lives.
enum Holder {
    /// With the engine: the pipe is closed and the operator owns the slots.
    Parked(Pipe),
    /// With a blocking worker (forwarding loop).
    Running(JoinHandle<Pipe>),
    /// A worker died holding it.
    Lost,
}

/// The control surface over one inspection point. The console holds one
/// instance of this for the whole session.
pub struct PipeEngine {
    config: SessionConfig,
    holder: Holder,
    flow: FlowControl,
    sequence: Arc<AtomicU64>,
    breakpoints: watch::Sender<BreakpointSet>,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl std::fmt::Debug for PipeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeEngine")
            .field("name", &self.config.name)
            .field("flow_state", &self.flow_state())
            .field("sequence", &self.sequence_number())
            .finish()
    }
}

impl PipeEngine {
    /// Build a closed session over `source` and `sink`. The receiver carries
    /// everything the forwarding loop reports asynchronously.
    pub fn new(
        source: impl Source + 'static,
        sink: impl Sink + 'static,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (breakpoints, _) = watch::channel(BreakpointSet::new());

        let cursor = Cursor::new(source);
        let sequence = cursor.sequence_counter();

        let engine = Self {
            config,
            holder: Holder::Parked(Pipe::new(cursor, sink)),
            flow: FlowControl::new(),
            sequence,
            breakpoints,
            events: event_tx,
        };

        (engine, event_rx)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ----------------------------------------------------------------
    // Flow state
    // ----------------------------------------------------------------

    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    pub fn is_open(&self) -> bool {
        self.flow_state() == FlowState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.flow_state() == FlowState::Closed
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Start the forwarding loop.
    pub async fn open(&mut self) -> Result<(), EngineError> {
        if self.flow.is_running() {
            return Err(InvalidCommand::AlreadyOpen.into());
        }
        self.settle().await?;

        let pipe = match std::mem::replace(&mut self.holder, Holder::Lost) {
            Holder::Parked(pipe) => pipe,
            other => {
                self.holder = other;
                return Err(EngineError::WorkerLost);
            }
        };

        if pipe.cursor.is_exhausted() {
            self.holder = Holder::Parked(pipe);
            return Err(EngineError::UpstreamExhausted);
        }

        if !self.flow.start() {
            self.holder = Holder::Parked(pipe);
            return Err(InvalidCommand::AlreadyOpen.into());
        }

        let worker = ForwardingLoop::new(
            pipe,
            self.flow.clone(),
            self.breakpoints.subscribe(),
            self.events.clone(),
        );
        self.holder = Holder::Running(tokio::task::spawn_blocking(move || worker.run()));
        tracing::debug!(name = %self.config.name, "pipe opened");
        Ok(())
    }

    /// Ask the forwarding loop to stop. Advisory: the loop notices at the end
    /// of its current iteration and then reports `StreamEvent::Paused`.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if !self.flow.request_close() {
            return Err(InvalidCommand::AlreadyClosed.into());
        }
        tracing::debug!(name = %self.config.name, "close requested");
        Ok(())
    }

    /// Wait until a running loop has stopped and handed the pipe back.
    /// Returns immediately when the pipe is already closed.
    pub async fn wait_closed(&mut self) -> Result<(), EngineError> {
        self.settle().await
    }

    async fn settle(&mut self) -> Result<(), EngineError> {
        let Holder::Running(handle) = &mut self.holder else {
            return Ok(());
        };

        let joined = handle.await;
        match joined {
            Ok(pipe) => {
                self.holder = Holder::Parked(pipe);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "forwarding loop died");
                self.holder = Holder::Lost;
                Err(EngineError::WorkerLost)
            }
        }
    }

    /// The pipe, if the operator currently owns it.
    async fn parked(&mut self) -> Result<&mut Pipe, EngineError> {
        if self.flow.is_running() {
            return Err(if self.flow.close_requested() {
                InvalidCommand::Closing.into()
            } else {
                InvalidCommand::PipeOpen.into()
            });
        }
        // The loop has already dropped the flag; collecting the pipe is quick.
        self.settle().await?;

        match &mut self.holder {
            Holder::Parked(pipe) => Ok(pipe),
            _ => Err(EngineError::WorkerLost),
        }
    }

    // ----------------------------------------------------------------
    // Operator actions (pipe closed)
    // ----------------------------------------------------------------

    /// Manual single-unit advance. Pulls on a blocking worker since upstream
    /// may be quiet. Dropping the future while the pull is pending abandons the
    /// pipe with its worker; the engine then reports `WorkerLost`.
    pub async fn step(&mut self) -> Result<Step, EngineError> {
        self.parked().await?;

        let Holder::Parked(mut pipe) = std::mem::replace(&mut self.holder, Holder::Lost) else {
            return Err(EngineError::WorkerLost);
        };

        let joined = tokio::task::spawn_blocking(move || {
            let result = pipe.step();
            (pipe, result)
        })
        .await;

        let (pipe, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "step worker died");
                self.report_terminal(&EngineError::WorkerLost);
                return Err(EngineError::WorkerLost);
            }
        };
        self.holder = Holder::Parked(pipe);

        if let Err(e) = &result {
            self.report_terminal(e);
        }
        result
    }

    /// Move `current` to `previous` without forwarding it.
    pub async fn flush(&mut self) -> Result<Option<Unit>, EngineError> {
        let pipe = self.parked().await?;
        Ok(pipe.cursor.flush().cloned())
    }

    pub async fn current_value(&mut self) -> Result<Option<Unit>, EngineError> {
        let pipe = self.parked().await?;
        Ok(pipe.cursor.read_current().cloned())
    }

    pub async fn previous_value(&mut self) -> Result<Option<Unit>, EngineError> {
        let pipe = self.parked().await?;
        Ok(pipe.cursor.read_previous().cloned())
    }

    pub async fn mutate(&mut self, slot: SlotName, unit: Unit) -> Result<(), EngineError> {
        let pipe = self.parked().await?;
        pipe.cursor.mutate(slot, unit);
        Ok(())
    }

    /// Run a mutator against the slots and store its result in `slot`.
    /// On error both slots are left as they were.
    pub async fn apply(
        &mut self,
        slot: SlotName,
        mutator: &dyn Mutator,
    ) -> Result<Unit, EngineError> {
        let pipe = self.parked().await?;
        let unit = mutator.apply(
            slot,
            pipe.cursor.read_current(),
            pipe.cursor.read_previous(),
        )?;
        pipe.cursor.mutate(slot, unit.clone());
        Ok(unit)
    }

    // ----------------------------------------------------------------
    // Breakpoints (any time)
    // ----------------------------------------------------------------

    /// Arm a glob breakpoint. Returns whether it compiled; an invalid
    /// pattern is still armed but never matches.
    pub fn arm(&self, pattern: impl Into<String>) -> bool {
        let pattern = pattern.into();
        let mut valid = false;
        self.breakpoints.send_modify(|set| {
            valid = set.arm(pattern).is_valid();
        });
        valid
    }

    pub fn clear_patterns(&self) {
        self.breakpoints.send_modify(|set| set.clear());
    }

    pub fn patterns(&self) -> Vec<String> {
        self.breakpoints.borrow().patterns()
    }

    // ----------------------------------------------------------------
    // Reporting / teardown
    // ----------------------------------------------------------------

    /// Everything observable right now. Slots are only included while closed.
    pub async fn snapshot(&mut self) -> Snapshot {
        let patterns = self.patterns();
        let name = self.config.name.clone();
        let sequence = self.sequence_number();
        let observed = self.flow_state();

        let (flow_state, current, previous) = match self.parked().await {
            Ok(pipe) => (
                FlowState::Closed,
                pipe.cursor.read_current().cloned(),
                pipe.cursor.read_previous().cloned(),
            ),
            Err(_) => (observed, None, None),
        };

        Snapshot {
            name,
            flow_state,
            sequence,
            current,
            previous,
            patterns,
        }
    }

    /// Flush downstream if the pipe is home. A loop still blocked on
    /// upstream is asked to stop and left behind.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        match &mut self.holder {
            Holder::Parked(pipe) => pipe.flush_sink(),
            Holder::Running(_) => {
                let _ = self.flow.request_close();
                Ok(())
            }
            Holder::Lost => Ok(()),
        }
    }

    fn report_terminal(&self, err: &EngineError) {
        let sequence = self.sequence_number();
        let event = match err {
            EngineError::UpstreamExhausted => StreamEvent::Exhausted { sequence },
            e if e.is_terminal() => StreamEvent::Failed {
                sequence,
                message: e.to_string(),
            },
            _ => return,
        };
        let _ = self.events.send(event);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether values flow on their own (`Open`) or wait for the operator (`Closed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    Open,
    Closed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Open => f.write_str("open"),
            FlowState::Closed => f.write_str("closed"),
        }
    }
}

/// Why the forwarding loop went back to `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint { pattern: String },
    CloseRequested,
    Exhausted,
    Failed(String),
}

/// The two flags both sides of the pipe may touch concurrently:
/// "a loop is running" and "the operator asked it to stop".
#[derive(Debug, Clone, Default)]
pub struct FlowControl {
    running: Arc<AtomicBool>,
    close_requested: Arc<AtomicBool>,
}

impl FlowControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlowState {
        if self.is_running() {
            FlowState::Open
        } else {
            FlowState::Closed
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    /// STOPPED -> RUNNING. Returns false if a loop already holds the flag.
    pub(crate) fn start(&self) -> bool {
        let started = self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if started {
            self.close_requested.store(false, Ordering::SeqCst);
        }
        started
    }

    /// Ask a running loop to stop. Returns true only for the first request
    /// against a running loop.
    pub(crate) fn request_close(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        !self.close_requested.swap(true, Ordering::SeqCst)
    }

    /// RUNNING -> STOPPED. Called by the loop itself on the way out.
    pub(crate) fn stop(&self) {
        self.close_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

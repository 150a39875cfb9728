//! The main control loop: operator lines in, engine events in, console out.

use crate::console::events::render_event;
use crate::console::parser::{Command, CommandParser};
use crate::console::runner::{ExecuteResult, INTRO, Runner};

use anyhow::{Context, Result};
use pipespector_core::StreamEvent;
use pipespector_io::ConsoleWriter;
use std::io::Write;
use tokio::sync::mpsc;

/// Why the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operator typed `exit`.
    Exited,
    /// The console device hit EOF.
    ConsoleClosed,
    /// Upstream ran dry.
    Exhausted,
    /// Upstream or downstream broke.
    Failed(String),
}

pub struct App<W> {
    runner: Runner,
    console: ConsoleWriter<W>,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    prompt: String,
}

impl<W: Write> App<W> {
    pub fn new(
        runner: Runner,
        console: ConsoleWriter<W>,
        events: mpsc::UnboundedReceiver<StreamEvent>,
    ) -> Self {
        let prompt = runner.prompt();
        Self {
            runner,
            console,
            events,
            prompt,
        }
    }

    pub fn runner_mut(&mut self) -> &mut Runner {
        &mut self.runner
    }

    /// Drive the session until exit, console EOF or a terminal event.
    /// Downstream is flushed on every way out.
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>) -> Result<(Outcome, W)> {
        self.console.write_line(INTRO).context("Console write failed")?;
        self.console.write_str(&self.prompt).context("Console write failed")?;

        let outcome = self.event_loop(&mut lines).await;

        if let Err(e) = self.runner.shutdown() {
            tracing::warn!(error = %e, "final downstream flush failed");
        }
        tracing::info!(?outcome, "session ended");

        Ok((outcome?, self.console.into_inner()))
    }

    async fn event_loop(&mut self, lines: &mut mpsc::Receiver<String>) -> Result<Outcome> {
        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else {
                        return Ok(Outcome::ConsoleClosed);
                    };

                    let result = match self.execute_interruptible(&line, lines).await? {
                        Ok(result) => result,
                        Err(outcome) => return Ok(outcome),
                    };
                    match result {
                        ExecuteResult::Exit => return Ok(Outcome::Exited),
                        ExecuteResult::Output(text) => {
                            self.console.write_line(&text).context("Console write failed")?;
                        }
                        ExecuteResult::Silent => {}
                    }

                    // A step that hit the end reports it as an event; show it before the prompt.
                    while let Ok(event) = self.events.try_recv() {
                        if let Some(outcome) = self.show_event(&event)? {
                            return Ok(outcome);
                        }
                    }
                    self.console.write_str(&self.prompt).context("Console write failed")?;
                }

                Some(event) = self.events.recv() => {
                    // The prompt is already on screen.
                    self.console.write_str("\n").context("Console write failed")?;
                    if let Some(outcome) = self.show_event(&event)? {
                        return Ok(outcome);
                    }
                    self.console.write_str(&self.prompt).context("Console write failed")?;
                }
            }
        }
    }

    /// Run one command while still listening to the console. A `step` on a
    /// quiet upstream can wait indefinitely; meanwhile only `exit` (or console
    /// EOF) is honoured, which abandons the pending pull.
    async fn execute_interruptible(
        &mut self,
        line: &str,
        lines: &mut mpsc::Receiver<String>,
    ) -> Result<std::result::Result<ExecuteResult, Outcome>> {
        let execution = self.runner.execute(line);
        tokio::pin!(execution);

        loop {
            tokio::select! {
                result = &mut execution => return Ok(Ok(result)),

                next = lines.recv() => match next.as_deref().map(CommandParser::parse) {
                    None => return Ok(Err(Outcome::ConsoleClosed)),
                    Some(Command::Exit) => return Ok(Err(Outcome::Exited)),
                    Some(_) => {
                        self.console
                            .write_line("Waiting for upstream; only 'exit' is accepted")
                            .context("Console write failed")?;
                    }
                },
            }
        }
    }

    fn show_event(&mut self, event: &StreamEvent) -> Result<Option<Outcome>> {
        let text = render_event(event, self.runner.framing());
        self.console.write_line(&text).context("Console write failed")?;

        Ok(match event {
            StreamEvent::Exhausted { .. } => Some(Outcome::Exhausted),
            StreamEvent::Failed { message, .. } => Some(Outcome::Failed(message.clone())),
            StreamEvent::BreakpointHit { .. } | StreamEvent::Paused { .. } => None,
        })
    }
}

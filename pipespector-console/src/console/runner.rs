use crate::console::parser::{BreakCommand, Command, CommandParser};

use pipespector_core::{EngineError, FlowState, MutationError, PipeEngine, Step, Unit};
use pipespector_io::render::{render_slot, render_unit};
use pipespector_io::{Framing, tty};
use pipespector_script::Script;

pub const INTRO: &str = "Type 'help' or '?' to list commands";

pub const HELP: &str = "\
Commands:
  open              Let the pipe flow freely
  close             Pause the flow (after the unit in flight)
  step              Forward the current value, or pull the next one
                    (waits for upstream; 'exit' still leaves)
  flush             Drop the current value into previous without forwarding it
  curr              Print the current value
  prev              Print the previous value
  seq               Print the sequence number
  break <glob>      Pause when a pulled value matches <glob>
  break clear       Remove every breakpoint
  break             List breakpoints
  info [json]       Print pipe information
  exec <script>     Rewrite slots, e.g. exec curr = prev + b\"\\n\"
  help, ?           Show this help
  exit, quit        Leave pipespector";

/// Result of executing a console line. Tells the app loop what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Nothing to print.
    Silent,
    /// Text for the operator, without a trailing newline.
    Output(String),
    Exit,
}

/// What the process is wired between, for `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub upstream: String,
    pub downstream: String,
}

impl Endpoints {
    pub fn new(upstream: impl Into<String>, downstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            downstream: downstream.into(),
        }
    }

    pub fn detect() -> Self {
        Self::new(
            tty::describe_fd(tty::STDIN_FD),
            tty::describe_fd(tty::STDOUT_FD),
        )
    }
}

#[derive(Debug)]
pub struct Runner {
    engine: PipeEngine,
    framing: Framing,
    endpoints: Endpoints,
}

impl Runner {
    pub fn new(engine: PipeEngine, endpoints: Endpoints) -> Self {
        let framing = Framing::from_binary_flag(engine.config().binary);
        Self {
            engine,
            framing,
            endpoints,
        }
    }

    pub fn engine(&self) -> &PipeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PipeEngine {
        &mut self.engine
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn prompt(&self) -> String {
        format!("({})> ", self.engine.config().name)
    }

    /// Parse one console line and route it to the engine.
    pub async fn execute(&mut self, line: &str) -> ExecuteResult {
        let command = CommandParser::parse(line);
        tracing::debug!(?command, "console command");

        match self.dispatch(command).await {
            Ok(result) => result,
            // Exhaustion and pipe failures arrive through the event channel.
            Err(e) if e.is_terminal() => ExecuteResult::Silent,
            Err(e) => ExecuteResult::Output(e.to_string()),
        }
    }

    /// Flush downstream before the process goes away.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        self.engine.shutdown()
    }

    async fn dispatch(&mut self, command: Command) -> Result<ExecuteResult, EngineError> {
        let output = match command {
            Command::Empty => return Ok(ExecuteResult::Silent),
            Command::Exit => return Ok(ExecuteResult::Exit),
            Command::Help => HELP.to_string(),

            Command::Open => {
                self.engine.open().await?;
                return Ok(ExecuteResult::Silent);
            }

            Command::Close => {
                self.engine.close()?;
                "Closing pipe...".to_string()
            }

            Command::Step => match self.engine.step().await? {
                Step::Forwarded(unit) => format!("stdout:\n{}", self.render(&unit)),
                Step::Pulled(unit) => format!(
                    "stdin ({}):\n{}",
                    self.engine.sequence_number(),
                    self.render(&unit)
                ),
            },

            Command::Flush => match self.engine.current_value().await? {
                Some(unit) => {
                    self.engine.flush().await?;
                    format!("Flushed without forwarding:\n{}", self.render(&unit))
                }
                None => "No current value available".to_string(),
            },

            Command::Current => {
                let unit = self.engine.current_value().await?;
                self.render_slot(unit.as_ref(), "current")
            }

            Command::Previous => {
                let unit = self.engine.previous_value().await?;
                self.render_slot(unit.as_ref(), "previous")
            }

            Command::Sequence => self.engine.sequence_number().to_string(),

            Command::Break(cmd) => self.handle_break(cmd),

            Command::Info { json } => self.handle_info(json).await,

            Command::Exec(src) => self.handle_exec(&src).await?,

            Command::Unknown(line) => format!("Unknown command: {}", line),
        };

        Ok(ExecuteResult::Output(output))
    }

    fn handle_break(&mut self, cmd: BreakCommand) -> String {
        match cmd {
            BreakCommand::Arm(pattern) => {
                if self.engine.arm(pattern.as_str()) {
                    format!("Breakpoint armed: {}", pattern)
                } else {
                    format!(
                        "⚠️ Breakpoint armed: {} (not a valid glob, it will never match)",
                        pattern
                    )
                }
            }
            BreakCommand::Clear => {
                self.engine.clear_patterns();
                "Breakpoints cleared".to_string()
            }
            BreakCommand::List => {
                let patterns = self.engine.patterns();
                if patterns.is_empty() {
                    return "No breakpoints armed".to_string();
                }
                patterns
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("  [{}] {}", i, p))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }

    async fn handle_info(&mut self, json: bool) -> String {
        let snapshot = self.engine.snapshot().await;

        if json {
            return serde_json::to_string_pretty(&snapshot)
                .unwrap_or_else(|e| format!("Failed to encode snapshot: {}", e));
        }

        let mut lines = vec![
            format!(
                "{} -> {} -> {}",
                self.endpoints.upstream, snapshot.name, self.endpoints.downstream
            ),
            format!("({}) values have been passed in pipe", snapshot.sequence),
            format!("Pipe is {}", snapshot.flow_state),
        ];

        if snapshot.flow_state == FlowState::Closed {
            lines.push(format!(
                "Current value in pipe: {}",
                self.render_slot(snapshot.current.as_ref(), "current")
            ));
            lines.push(format!(
                "Previous value in pipe: {}",
                self.render_slot(snapshot.previous.as_ref(), "previous")
            ));
        }

        if !snapshot.patterns.is_empty() {
            lines.push(format!("Breakpoints: {}", snapshot.patterns.join(", ")));
        }

        lines.join("\n")
    }

    async fn handle_exec(&mut self, src: &str) -> Result<String, EngineError> {
        let script = Script::parse(src).map_err(MutationError::from)?;
        let applied = script.execute(&mut self.engine).await?;

        Ok(applied
            .iter()
            .map(|(slot, unit)| format!("{} = {}", slot, self.render(unit)))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn render(&self, unit: &Unit) -> String {
        let mut rendered = render_unit(unit, self.framing);
        rendered.pop();
        rendered
    }

    fn render_slot(&self, unit: Option<&Unit>, label: &str) -> String {
        let mut rendered = render_slot(unit, label, self.framing);
        rendered.pop();
        rendered
    }
}

use anyhow::{Context, Result};
use clap::Parser;

use pipespector_console::util;
use pipespector_console::{App, Endpoints, Outcome, Runner};
use pipespector_core::{PipeEngine, SessionConfig};
use pipespector_io::{ConsoleDevice, DEFAULT_CONSOLE, Framing, LineSource, WriterSink, tty};

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "pipespector")]
#[command(about = "Interactive inspection point for shell pipelines: producer | pipespector | consumer")]
#[command(version)]
struct Cli {
    /// Session name shown in the prompt
    #[arg(long, short = 'n', default_value = "pipespector")]
    name: String,

    /// Treat the stream as raw byte records instead of text lines
    #[arg(long, short = 'b')]
    bytes: bool,

    /// Device the operator console reads from and writes to
    #[arg(long, default_value = DEFAULT_CONSOLE)]
    console: PathBuf,

    /// Glob breakpoint armed before the console starts (repeatable)
    #[arg(long = "break", short = 'B', value_name = "PATTERN")]
    breakpoints: Vec<String>,

    /// Let the pipe flow as soon as the session starts
    #[arg(long)]
    open: bool,

    /// Enable debug logging (stderr)
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    util::init_tracing(cli.debug);
    util::install_panic_hook();

    match run(cli) {
        Ok(Outcome::Failed(message)) => {
            tracing::error!(%message, "pipe failed");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pipespector: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    tty::ensure_piped()?;
    let device = ConsoleDevice::open(&cli.console)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let outcome = runtime.block_on(session(cli, device));

    // A forwarding loop parked on a quiet upstream is left behind.
    runtime.shutdown_timeout(Duration::from_millis(100));
    outcome
}

async fn session(cli: Cli, device: ConsoleDevice) -> Result<Outcome> {
    let framing = Framing::from_binary_flag(cli.bytes);
    let config = SessionConfig {
        name: cli.name,
        binary: cli.bytes,
    };
    tracing::info!(name = %config.name, ?framing, console = %device.path().display(), "starting session");

    let (engine, events) = PipeEngine::new(LineSource::stdin(), WriterSink::stdout(), config);
    for pattern in &cli.breakpoints {
        if !engine.arm(pattern.as_str()) {
            tracing::warn!(%pattern, "breakpoint is not a valid glob and will never match");
        }
    }

    let (lines, writer) = device.start();
    let mut app = App::new(Runner::new(engine, Endpoints::detect()), writer, events);

    if cli.open {
        app.runner_mut()
            .engine_mut()
            .open()
            .await
            .context("Failed to open the pipe")?;
    }

    let (outcome, _console) = app.run(lines).await?;
    Ok(outcome)
}

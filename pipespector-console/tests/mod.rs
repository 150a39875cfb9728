use pipespector_console::console::events::EXHAUSTED_MESSAGE;
use pipespector_console::console::runner::{HELP, INTRO};
use pipespector_console::{
    App, BreakCommand, Command, CommandParser, Endpoints, ExecuteResult, Outcome, Runner,
};
use pipespector_core::{EngineError, PipeEngine, SessionConfig, Source, StreamEvent, Unit};
use pipespector_io::{ConsoleWriter, Framing};

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Helpers
// ============================================================================

type Captured = Arc<Mutex<Vec<Unit>>>;

fn config(binary: bool) -> SessionConfig {
    SessionConfig {
        name: "test".to_string(),
        binary,
    }
}

fn runner_over(values: &[&str]) -> (Runner, Captured, mpsc::UnboundedReceiver<StreamEvent>) {
    let source: VecDeque<Unit> = values.iter().map(|v| Unit::from(*v)).collect();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let (engine, events) = PipeEngine::new(source, captured.clone(), config(false));
    (
        Runner::new(engine, Endpoints::new("pipe:[1]", "pipe:[2]")),
        captured,
        events,
    )
}

/// A source that never runs dry until the sender is dropped.
fn quiet_runner() -> (
    Runner,
    std::sync::mpsc::Sender<Unit>,
    mpsc::UnboundedReceiver<StreamEvent>,
) {
    let (tx, rx) = std::sync::mpsc::channel::<Unit>();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let (engine, events) = PipeEngine::new(rx, captured, config(false));
    (Runner::new(engine, Endpoints::new("in", "out")), tx, events)
}

struct PanickingSource;

impl Source for PanickingSource {
    fn pull(&mut self) -> io::Result<Option<Unit>> {
        panic!("upstream reader bug");
    }
}

fn output(result: ExecuteResult) -> String {
    match result {
        ExecuteResult::Output(text) => text,
        other => panic!("expected output, got {:?}", other),
    }
}

fn forwarded(captured: &Captured) -> Vec<Unit> {
    captured.lock().unwrap().clone()
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

async fn feed(lines: &[&str]) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(lines.len().max(1));
    for line in lines {
        tx.send(line.to_string()).await.unwrap();
    }
    rx
}

// ============================================================================
// Parser Tests
// ============================================================================

#[test]
fn test_parse_simple_commands() {
    assert_eq!(CommandParser::parse("open"), Command::Open);
    assert_eq!(CommandParser::parse("close"), Command::Close);
    assert_eq!(CommandParser::parse("?"), Command::Help);
    assert_eq!(CommandParser::parse("quit"), Command::Exit);
    assert_eq!(CommandParser::parse("prev"), Command::Previous);
    assert_eq!(CommandParser::parse("seq"), Command::Sequence);
    assert_eq!(CommandParser::parse("   "), Command::Empty);
}

#[test]
fn test_parse_break_forms() {
    assert_eq!(CommandParser::parse("break"), Command::Break(BreakCommand::List));
    assert_eq!(
        CommandParser::parse("break clear"),
        Command::Break(BreakCommand::Clear)
    );
    assert_eq!(
        CommandParser::parse("break *error*"),
        Command::Break(BreakCommand::Arm("*error*".to_string()))
    );
}

#[test]
fn test_parse_info_and_exec() {
    assert_eq!(CommandParser::parse("info"), Command::Info { json: false });
    assert_eq!(CommandParser::parse("info json"), Command::Info { json: true });
    assert_eq!(
        CommandParser::parse("exec curr = prev + b\"\\n\""),
        Command::Exec("curr = prev + b\"\\n\"".to_string())
    );
}

#[test]
fn test_parse_unknown() {
    assert_eq!(
        CommandParser::parse("frobnicate now"),
        Command::Unknown("frobnicate now".to_string())
    );
}

// ============================================================================
// Runner Tests
// ============================================================================

#[tokio::test]
async fn test_help_lists_commands() {
    let (mut runner, _, _) = runner_over(&[]);
    assert_eq!(output(runner.execute("help").await), HELP);
    assert_eq!(runner.execute("").await, ExecuteResult::Silent);
    assert_eq!(runner.execute("exit").await, ExecuteResult::Exit);
}

#[tokio::test]
async fn test_step_pulls_then_forwards() {
    let (mut runner, captured, _) = runner_over(&["a\n", "b\n"]);

    assert_eq!(output(runner.execute("step").await), "stdin (1):\na");
    assert!(forwarded(&captured).is_empty());

    assert_eq!(output(runner.execute("step").await), "stdout:\na");
    assert_eq!(forwarded(&captured), vec![Unit::from("a\n")]);

    assert_eq!(output(runner.execute("prev").await), "a");
    assert_eq!(output(runner.execute("curr").await), "No current value available");
    assert_eq!(output(runner.execute("seq").await), "1");
}

#[tokio::test]
async fn test_step_past_the_end_reports_through_events() {
    let (mut runner, _, mut events) = runner_over(&[]);
    assert_eq!(runner.execute("step").await, ExecuteResult::Silent);
    assert_eq!(events.try_recv().unwrap(), StreamEvent::Exhausted { sequence: 0 });
}

#[tokio::test]
async fn test_flush_skips_forwarding() {
    let (mut runner, captured, _) = runner_over(&["drop me\n", "keep\n"]);
    runner.execute("step").await;

    assert_eq!(
        output(runner.execute("flush").await),
        "Flushed without forwarding:\ndrop me"
    );
    assert_eq!(output(runner.execute("flush").await), "No current value available");

    runner.execute("step").await;
    runner.execute("step").await;
    assert_eq!(forwarded(&captured), vec![Unit::from("keep\n")]);
}

#[tokio::test]
async fn test_close_when_closed_is_reported() {
    let (mut runner, _, _) = runner_over(&["a\n"]);
    assert_eq!(output(runner.execute("close").await), "Pipe is already closed");
    assert_eq!(output(runner.execute("close").await), "Pipe is already closed");
}

#[tokio::test]
async fn test_open_pipe_refuses_operator_commands() {
    let (mut runner, tx, _events) = quiet_runner();

    assert_eq!(runner.execute("open").await, ExecuteResult::Silent);
    assert_eq!(output(runner.execute("open").await), "Pipe is already open");
    assert_eq!(
        output(runner.execute("curr").await),
        "Pipe is open; close it first"
    );
    assert_eq!(
        output(runner.execute("exec curr = 'x'").await),
        "Pipe is open; close it first"
    );

    assert_eq!(output(runner.execute("close").await), "Closing pipe...");
    tx.send(Unit::from("wake\n")).unwrap();
    runner.engine_mut().wait_closed().await.unwrap();
    assert_eq!(output(runner.execute("curr").await), "wake");
}

#[tokio::test]
async fn test_break_arm_list_clear() {
    let (mut runner, _, _) = runner_over(&[]);

    assert_eq!(
        output(runner.execute("break *error*").await),
        "Breakpoint armed: *error*"
    );
    assert!(output(runner.execute("break [oops").await).contains("never match"));
    assert_eq!(
        output(runner.execute("break").await),
        "  [0] *error*\n  [1] [oops"
    );

    assert_eq!(output(runner.execute("break clear").await), "Breakpoints cleared");
    assert_eq!(output(runner.execute("break").await), "No breakpoints armed");
}

#[tokio::test]
async fn test_exec_rewrites_the_next_forward() {
    let (mut runner, captured, _) = runner_over(&["{\"ok\": false}\n"]);
    runner.execute("step").await;

    let text = output(runner.execute(r#"exec curr = b'{"ok": true}\n'"#).await);
    assert_eq!(text, "current = {\"ok\": true}");

    runner.execute("step").await;
    assert_eq!(forwarded(&captured), vec![Unit::from("{\"ok\": true}\n")]);
}

#[tokio::test]
async fn test_exec_failure_leaves_slots() {
    let (mut runner, _, _) = runner_over(&["a\n"]);
    runner.execute("step").await;

    let text = output(runner.execute("exec curr = prev").await);
    assert_eq!(text, "Mutation failed: previous is empty");

    let text = output(runner.execute("exec curr = (").await);
    assert!(text.starts_with("Mutation failed: syntax error"));

    assert_eq!(output(runner.execute("curr").await), "a");
}

#[tokio::test]
async fn test_info_text() {
    let (mut runner, _, _) = runner_over(&["a\n"]);
    runner.execute("step").await;
    runner.execute("break *x*").await;

    let text = output(runner.execute("info").await);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "pipe:[1] -> test -> pipe:[2]");
    assert_eq!(lines[1], "(1) values have been passed in pipe");
    assert_eq!(lines[2], "Pipe is closed");
    assert_eq!(lines[3], "Current value in pipe: a");
    assert_eq!(lines[4], "Previous value in pipe: No previous value available");
    assert_eq!(lines[5], "Breakpoints: *x*");
}

#[tokio::test]
async fn test_info_json() {
    let (mut runner, _, _) = runner_over(&["a\n"]);
    runner.execute("step").await;

    let value: serde_json::Value =
        serde_json::from_str(&output(runner.execute("info json").await)).unwrap();
    assert_eq!(value["name"], "test");
    assert_eq!(value["flow_state"], "closed");
    assert_eq!(value["sequence"], 1);
    assert_eq!(value["current"], "a\n");
    assert!(value["previous"].is_null());
}

#[tokio::test]
async fn test_binary_session_escapes_output() {
    let source: VecDeque<Unit> = VecDeque::from(vec![Unit::from(vec![0x1b, b'[', b'2', b'J', b'\n'])]);
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let (engine, _events) = PipeEngine::new(source, captured, config(true));
    let mut runner = Runner::new(engine, Endpoints::new("in", "out"));

    assert_eq!(runner.framing(), Framing::Binary);
    assert_eq!(
        output(runner.execute("step").await),
        "stdin (1):\nb\"\\x1b[2J\\n\""
    );
}

// ============================================================================
// App Loop Tests
// ============================================================================

#[tokio::test]
async fn test_app_exit() {
    let (runner, _, events) = runner_over(&["a\n"]);
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let (outcome, console) = app.run(feed(&["seq", "exit"]).await).await.unwrap();
    assert_eq!(outcome, Outcome::Exited);
    assert_eq!(
        String::from_utf8(console).unwrap(),
        format!("{}\n(test)> 0\n(test)> ", INTRO)
    );
}

#[tokio::test]
async fn test_app_console_eof() {
    let (runner, _, events) = runner_over(&[]);
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let (outcome, _) = app.run(feed(&[]).await).await.unwrap();
    assert_eq!(outcome, Outcome::ConsoleClosed);
}

#[tokio::test]
async fn test_app_stepping_past_the_end_exits() {
    let (runner, captured, events) = runner_over(&["only\n"]);
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let lines = feed(&["step", "step", "step", "seq"]).await;
    let (outcome, console) = app.run(lines).await.unwrap();

    assert_eq!(outcome, Outcome::Exhausted);
    assert_eq!(forwarded(&captured), vec![Unit::from("only\n")]);

    let console = String::from_utf8(console).unwrap();
    assert!(console.ends_with(&format!("{}\n", EXHAUSTED_MESSAGE)));
}

#[tokio::test]
async fn test_app_open_runs_to_exhaustion() {
    let (runner, captured, events) = runner_over(&["a\n", "b\n", "c\n"]);
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let (tx, rx) = mpsc::channel(4);
    tx.send("open".to_string()).await.unwrap();

    let (outcome, console) = app.run(rx).await.unwrap();
    assert_eq!(outcome, Outcome::Exhausted);
    assert_eq!(
        forwarded(&captured),
        vec![Unit::from("a\n"), Unit::from("b\n"), Unit::from("c\n")]
    );
    assert!(String::from_utf8(console).unwrap().contains(EXHAUSTED_MESSAGE));
    drop(tx);
}

#[tokio::test]
async fn test_app_breakpoint_pauses_until_operator_acts() {
    let (runner, captured, events) =
        runner_over(&["ok\n", "2024 error occurred\n", "later\n"]);
    runner.engine().arm("*error*");

    let buf = SharedBuf::default();
    let app = App::new(runner, ConsoleWriter::new(buf.clone()), events);
    let (tx, rx) = mpsc::channel(4);

    let driver = async {
        tx.send("open".to_string()).await.unwrap();
        for _ in 0..500 {
            if buf.text().contains("hit at") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send("curr".to_string()).await.unwrap();
        tx.send("exit".to_string()).await.unwrap();
    };

    let (result, _) = tokio::join!(app.run(rx), driver);
    let (outcome, _) = result.unwrap();

    assert_eq!(outcome, Outcome::Exited);
    assert_eq!(forwarded(&captured), vec![Unit::from("ok\n")]);

    let console = buf.text();
    assert!(console.contains("🔴 Breakpoint '*error*' hit at (2):\n2024 error occurred\n"));
    assert!(console.contains("(test)> 2024 error occurred\n"));
}

#[tokio::test]
async fn test_app_exit_while_step_waits_on_quiet_upstream() {
    let (runner, tx, events) = quiet_runner();
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let lines = feed(&["step", "seq", "exit"]).await;
    let (outcome, console) = tokio::time::timeout(Duration::from_secs(5), app.run(lines))
        .await
        .expect("exit must not wait for upstream")
        .unwrap();

    assert_eq!(outcome, Outcome::Exited);
    let console = String::from_utf8(console).unwrap();
    assert!(console.contains("Waiting for upstream; only 'exit' is accepted\n"));
    assert!(!console.contains("stdin ("));

    // Release the abandoned pull so the runtime can shut down.
    drop(tx);
}

#[tokio::test]
async fn test_app_console_eof_while_step_waits() {
    let (runner, tx, events) = quiet_runner();
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let (outcome, _) = tokio::time::timeout(Duration::from_secs(5), app.run(feed(&["step"]).await))
        .await
        .expect("console EOF must not wait for upstream")
        .unwrap();

    assert_eq!(outcome, Outcome::ConsoleClosed);
    drop(tx);
}

#[tokio::test]
async fn test_app_reports_a_dead_forwarding_worker() {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let (engine, events) = PipeEngine::new(PanickingSource, captured, config(false));
    let runner = Runner::new(engine, Endpoints::new("in", "out"));

    let buf = SharedBuf::default();
    let app = App::new(runner, ConsoleWriter::new(buf.clone()), events);
    let (tx, rx) = mpsc::channel(4);
    tx.send("open".to_string()).await.unwrap();

    let (outcome, _) = tokio::time::timeout(Duration::from_secs(5), app.run(rx))
        .await
        .expect("a dead worker must end the session")
        .unwrap();

    let expected = EngineError::WorkerLost.to_string();
    assert_eq!(outcome, Outcome::Failed(expected.clone()));
    assert!(buf.text().contains(&expected));
    drop(tx);
}

#[tokio::test]
async fn test_app_reports_a_step_that_panics() {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let (engine, events) = PipeEngine::new(PanickingSource, captured, config(false));
    let runner = Runner::new(engine, Endpoints::new("in", "out"));
    let app = App::new(runner, ConsoleWriter::new(Vec::new()), events);

    let (outcome, _) = app.run(feed(&["step", "seq"]).await).await.unwrap();
    assert_eq!(outcome, Outcome::Failed(EngineError::WorkerLost.to_string()));
}

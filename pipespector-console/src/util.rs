use std::any::Any;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr only: stdout is the downstream pipe and the console
/// device belongs to the operator.
pub fn init_tracing(debug: bool) {
    // RUST_LOG=pipespector_core=debug,pipespector_io=info
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(debug)
        .with_line_number(debug)
        .compact()
        .try_init();
}

/// Panics go through the subscriber so they stay on stderr and never reach the
/// console device. A forwarding worker that panics is also reported to the
/// operator as a failed pipe; this only records the thread and site.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = panic_message(info.payload());
        let current = std::thread::current();
        let thread = current.name().unwrap_or("<unnamed>");
        let site = info.location().map(ToString::to_string).unwrap_or_default();

        tracing::error!(thread, %site, %message, "thread panicked");
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(text), _) => (*text).to_string(),
        (None, Some(text)) => text.clone(),
        (None, None) => "opaque panic payload".to_string(),
    }
}

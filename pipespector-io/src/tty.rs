//! Pipe endpoint checks.
//!
//! The inspection point only makes sense between two pipes (or files). If
//! either stdin or stdout is a terminal the operator console and the data
//! stream would fight over the same device, so start-up refuses.

use anyhow::{Result, bail};

pub const STDIN_FD: i32 = 0;
pub const STDOUT_FD: i32 = 1;

#[cfg(unix)]
pub fn is_terminal_fd(fd: i32) -> bool {
    // SAFETY: isatty only inspects the descriptor; an invalid fd yields 0.
    unsafe { libc::isatty(fd) == 1 }
}

#[cfg(not(unix))]
pub fn is_terminal_fd(_fd: i32) -> bool {
    false
}

/// Decide from the two tty flags whether the tool may run.
pub fn check_endpoints(stdin_is_tty: bool, stdout_is_tty: bool) -> Result<()> {
    match (stdin_is_tty, stdout_is_tty) {
        (false, false) => Ok(()),
        (true, true) => bail!(
            "stdin and stdout are terminals; pipespector must sit inside a pipeline (producer | pipespector | consumer)"
        ),
        (true, false) => bail!("stdin is a terminal; pipe a producer into pipespector"),
        (false, true) => bail!("stdout is a terminal; pipe pipespector into a consumer"),
    }
}

/// Refuse to run unless both data endpoints are non-terminals.
pub fn ensure_piped() -> Result<()> {
    check_endpoints(is_terminal_fd(STDIN_FD), is_terminal_fd(STDOUT_FD))
}

/// Best-effort name of what a descriptor points at (`pipe:[1234]`, a path, ...).
pub fn describe_fd(fd: i32) -> String {
    match std::fs::read_link(format!("/proc/self/fd/{}", fd)) {
        Ok(target) => target.display().to_string(),
        Err(_) => match fd {
            STDIN_FD => "stdin".to_string(),
            STDOUT_FD => "stdout".to_string(),
            other => format!("fd {}", other),
        },
    }
}

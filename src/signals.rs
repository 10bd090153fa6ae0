//! Signal handling for esh
//!
//! - SIGINT, SIGWINCH: forwarded to the recorded foreground child, absorbed
//!   when there is none
//! - SIGTSTP, SIGTTIN, SIGTTOU: ignored by an interactive shell so it can
//!   move the terminal between process groups
//!
//! Children put every disposition back to the default before they exec.

use std::sync::atomic::{AtomicI32, Ordering};

#[cfg(unix)]
use nix::sys::signal::{kill, signal, SigHandler, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// PID of the current foreground child (or -1 if none)
pub static FOREGROUND_PID: AtomicI32 = AtomicI32::new(-1);

/// Signals passed on to the foreground child
#[cfg(unix)]
pub const FORWARDED: [Signal; 2] = [Signal::SIGINT, Signal::SIGWINCH];

#[cfg(unix)]
const JOB_CONTROL: [Signal; 3] = [Signal::SIGTSTP, Signal::SIGTTIN, Signal::SIGTTOU];

/// Install the forwarding handlers
#[cfg(unix)]
pub fn setup_signal_handlers() {
    use signal_hook::low_level;

    for sig in FORWARDED {
        // kill(2) is async-signal-safe; nothing else runs in the handler
        let result = unsafe { low_level::register(sig as i32, move || forward(sig)) };
        if let Err(e) = result {
            log::warn!("cannot install {} handler: {}", sig, e);
        }
    }
}

#[cfg(not(unix))]
pub fn setup_signal_handlers() {}

#[cfg(unix)]
fn forward(sig: Signal) {
    if let Some(pid) = get_foreground_pid() {
        let _ = kill(Pid::from_raw(pid), sig);
    }
}

/// Ignore the job-control stop signals (interactive mode only)
#[cfg(unix)]
pub fn ignore_job_control_signals() {
    for sig in JOB_CONTROL {
        if let Err(e) = unsafe { signal(sig, SigHandler::SigIgn) } {
            log::warn!("cannot ignore {}: {}", sig, e);
        }
    }
}

#[cfg(not(unix))]
pub fn ignore_job_control_signals() {}

/// Restore default dispositions in a freshly forked child
#[cfg(unix)]
pub fn restore_default_signals() {
    for sig in FORWARDED.iter().chain(JOB_CONTROL.iter()).chain([Signal::SIGQUIT].iter()) {
        let _ = unsafe { signal(*sig, SigHandler::SigDfl) };
    }
}

#[cfg(not(unix))]
pub fn restore_default_signals() {}

/// Set the foreground process PID
pub fn set_foreground_pid(pid: i32) {
    FOREGROUND_PID.store(pid, Ordering::SeqCst);
}

/// Clear the foreground process PID
pub fn clear_foreground_pid() {
    FOREGROUND_PID.store(-1, Ordering::SeqCst);
}

/// Get the current foreground process PID (or None if no foreground job)
pub fn get_foreground_pid() -> Option<i32> {
    let pid = FOREGROUND_PID.load(Ordering::SeqCst);
    if pid > 0 {
        Some(pid)
    } else {
        None
    }
}

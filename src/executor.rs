//! Executor: runs an assembled pipeline as child processes
//!
//! Every stage is forked with its stdout wired to the next stage's stdin.
//! The last stage inherits the shell's stdout unless it carries a
//! redirection. With job control on, the stages share one process group led
//! by the first child, and that group owns the terminal while it runs.

use crate::ast::{Pipeline, Redirect, RedirectMode, Stage};
use crate::signals;
use log::{debug, trace};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::signal::{kill, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, getpgrp, getpid, pipe, setpgid, ForkResult, Pid};
use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::RawFd;
use thiserror::Error;

/// Status of a command that could not be found
pub const NOT_FOUND_STATUS: i32 = 127;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("pipe: {0}")]
    Pipe(Errno),
    #[error("fork: {0}")]
    Fork(Errno),
}

/// Runs a command name inside the child when `execvp` fails.
/// Returns `None` if the name is not a builtin either.
pub type Fallback<'a> = dyn FnMut(&[String]) -> Option<i32> + 'a;

#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    job_control: bool,
}

impl Executor {
    /// Plain executor: children stay in the shell's process group
    pub fn new() -> Self {
        Executor { job_control: false }
    }

    /// Executor that hands the terminal to each foreground pipeline.
    /// Job control stays off when stdin is not a terminal.
    pub fn with_job_control() -> Self {
        Executor {
            job_control: stdin_is_tty(),
        }
    }

    pub fn job_control(&self) -> bool {
        self.job_control
    }

    /// Run every stage, then wait for the pipeline unless it is in the
    /// background. Returns the exit status of the last stage.
    pub fn run(&self, pipeline: &Pipeline, fallback: &mut Fallback<'_>) -> Result<i32, ExecError> {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        let count = pipeline.stages.len();
        let mut children: Vec<Pid> = Vec::with_capacity(count);
        let mut group: Option<Pid> = None;
        let mut input: Option<RawFd> = None;

        for (i, stage) in pipeline.stages.iter().enumerate() {
            let output = if i + 1 < count {
                match pipe() {
                    Ok(fds) => Some(fds),
                    Err(e) => {
                        abandon(input, &children);
                        return Err(ExecError::Pipe(e));
                    }
                }
            } else {
                None
            };

            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    if self.job_control {
                        let leader = group.unwrap_or_else(|| Pid::from_raw(0));
                        let _ = setpgid(Pid::from_raw(0), leader);
                    }
                    run_child(stage, input, output, fallback)
                }
                Ok(ForkResult::Parent { child }) => {
                    trace!("spawned {} as {}", stage.name(), child);
                    if self.job_control {
                        let leader = *group.get_or_insert(child);
                        // Both sides set the group so neither can race the other
                        let _ = setpgid(child, leader);
                    }
                    if let Some(fd) = input.take() {
                        let _ = close(fd);
                    }
                    if let Some((read, write)) = output {
                        let _ = close(write);
                        input = Some(read);
                    }
                    children.push(child);
                }
                Err(e) => {
                    if let Some((read, write)) = output {
                        let _ = close(read);
                        let _ = close(write);
                    }
                    abandon(input, &children);
                    return Err(ExecError::Fork(e));
                }
            }
        }

        if pipeline.background {
            debug!("background pipeline: {:?}", children);
            return Ok(0);
        }

        let last = match children.last() {
            Some(pid) => *pid,
            None => return Ok(0),
        };

        if let Some(leader) = group.filter(|_| self.job_control) {
            give_terminal(leader);
        }
        signals::set_foreground_pid(last.as_raw());
        let status = wait_members(&children, last);
        signals::clear_foreground_pid();
        if self.job_control {
            give_terminal(getpgrp());
        }
        reap_finished();

        Ok(status)
    }
}

/// Child side of a fork: wire descriptors, then exec. Never returns.
fn run_child(
    stage: &Stage,
    input: Option<RawFd>,
    output: Option<(RawFd, RawFd)>,
    fallback: &mut Fallback<'_>,
) -> ! {
    signals::restore_default_signals();

    if let Some(fd) = input {
        let _ = dup2(fd, libc::STDIN_FILENO);
        let _ = close(fd);
    }
    if let Some((read, write)) = output {
        let _ = close(read);
        let _ = dup2(write, libc::STDOUT_FILENO);
        let _ = close(write);
    }
    if let Some(redirect) = &stage.redirect {
        if let Err(e) = redirect_stdout(redirect) {
            eprintln!("esh: {}: {}", redirect.path.display(), e.desc());
            std::process::exit(1);
        }
    }

    let status = dispatch(&stage.argv, fallback);
    let _ = io::stdout().flush();
    std::process::exit(status)
}

fn redirect_stdout(redirect: &Redirect) -> Result<(), Errno> {
    let flags = match redirect.mode {
        RedirectMode::Truncate => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        RedirectMode::Append => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
    };
    let fd = open(redirect.path.as_path(), flags, Mode::from_bits_truncate(0o666))?;
    dup2(fd, libc::STDOUT_FILENO)?;
    close(fd)?;
    Ok(())
}

/// Replace the process image, falling back to a builtin of the same name
fn dispatch(argv: &[String], fallback: &mut Fallback<'_>) -> i32 {
    let name = match argv.first() {
        Some(n) => n,
        None => return 0,
    };

    match argv.iter().map(|a| CString::new(a.as_str())).collect::<Result<Vec<_>, _>>() {
        Ok(cargs) => match execvp(&cargs[0], &cargs) {
            Ok(never) => match never {},
            Err(e) => trace!("execvp {}: {}", name, e),
        },
        Err(_) => trace!("{}: argument contains a NUL byte", name),
    }

    if let Some(status) = fallback(argv) {
        return status;
    }
    eprintln!("{}: command not found", name);
    NOT_FOUND_STATUS
}

/// Wait until every member of the pipeline has been reaped. The status of
/// `last` is the pipeline's status. There is no job suspension: when a
/// member is stopped by Ctrl-Z or SIGSTOP, the whole pipeline is resumed and
/// the wait goes on.
fn wait_members(members: &[Pid], last: Pid) -> i32 {
    let mut status = 0;
    for pid in members {
        loop {
            match waitpid(*pid, Some(WaitPidFlag::WUNTRACED)) {
                Ok(WaitStatus::Stopped(_, sig)) => {
                    debug!("{} stopped by {}, resuming", pid, sig);
                    resume(members);
                }
                Ok(ws) => {
                    if *pid == last {
                        status = exit_status(ws);
                    }
                    break;
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    debug!("waitpid({}): {}", pid, e);
                    break;
                }
            }
        }
    }
    status
}

/// Send SIGCONT to every member. Ones already reaped fail with ESRCH, which
/// is ignored.
fn resume(members: &[Pid]) {
    for pid in members {
        let _ = kill(*pid, Signal::SIGCONT);
    }
}

/// Collect already-finished background children without blocking
pub fn reap_finished() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(ws) => trace!("reaped {:?}", ws),
        }
    }
}

/// Close the pending pipe end and wait out children already spawned
fn abandon(input: Option<RawFd>, children: &[Pid]) {
    if let Some(fd) = input {
        let _ = close(fd);
    }
    for child in children {
        let _ = waitpid(*child, None);
    }
}

/// Numeric status: exit code, or 128 + signal number
pub fn exit_status(ws: WaitStatus) -> i32 {
    match ws {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
        _ => 0,
    }
}

fn stdin_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

fn give_terminal(group: Pid) {
    if unsafe { libc::tcsetpgrp(libc::STDIN_FILENO, group.as_raw()) } != 0 {
        debug!("tcsetpgrp({}): {}", group, Errno::last());
    }
}

/// Put an interactive shell in its own process group and take the terminal
pub fn claim_terminal() {
    if !stdin_is_tty() {
        return;
    }
    let pid = getpid();
    if let Err(e) = setpgid(pid, pid) {
        // Already a group or session leader
        debug!("setpgid: {}", e);
    }
    give_terminal(getpgrp());
}

/// Serializes tests that fork, so the non-blocking sweep never reaps a
/// child another test is waiting for
#[cfg(test)]
pub(crate) static CHILDREN: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::state::ExpansionContext;
    use std::collections::HashMap;
    use std::fs;

    fn pipeline(line: &str) -> Pipeline {
        let tokens = lex(line, &ExpansionContext::with_env(HashMap::new())).unwrap();
        parse(tokens).unwrap()
    }

    fn run(line: &str) -> i32 {
        let _guard = CHILDREN.lock().unwrap_or_else(|e| e.into_inner());
        Executor::new().run(&pipeline(line), &mut |_| None).unwrap()
    }

    #[test]
    fn exit_status_of_last_stage() {
        assert_eq!(run("true"), 0);
        assert_eq!(run("false"), 1);
        assert_eq!(run("false | true"), 0);
        assert_eq!(run("true | false"), 1);
    }

    #[test]
    fn missing_command_is_127() {
        assert_eq!(run("definitely-not-a-command-esh"), NOT_FOUND_STATUS);
    }

    #[test]
    fn fallback_runs_in_child() {
        let _guard = CHILDREN.lock().unwrap_or_else(|e| e.into_inner());
        let status = Executor::new()
            .run(&pipeline("not-a-real-binary-esh"), &mut |argv| {
                (argv[0] == "not-a-real-binary-esh").then_some(7)
            })
            .unwrap();
        assert_eq!(status, 7);
    }

    #[test]
    fn redirect_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let out = out.display();

        assert_eq!(run(&format!("echo one > {}", out)), 0);
        assert_eq!(run(&format!("echo two >> {}", out)), 0);
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "one\ntwo\n");

        assert_eq!(run(&format!("echo three > {}", out)), 0);
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "three\n");
    }

    #[test]
    fn pipe_feeds_next_stage() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("count");
        assert_eq!(run(&format!("echo hello | wc -c > {}", out.display())), 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "6");
    }

    #[test]
    fn unopenable_redirect_fails_stage() {
        assert_eq!(run("echo hi > /nonexistent-dir-esh/out"), 1);
    }

    #[test]
    fn signal_status() {
        assert_eq!(
            exit_status(WaitStatus::Signaled(Pid::from_raw(1), nix::sys::signal::Signal::SIGKILL, false)),
            137
        );
        assert_eq!(exit_status(WaitStatus::Exited(Pid::from_raw(1), 3)), 3);
    }

    #[test]
    fn stopped_member_is_resumed() {
        let stage = Stage::new(vec!["sh".into(), "-c".into(), "kill -STOP $$; exit 5".into()]);
        let pipeline = Pipeline {
            stages: vec![stage],
            background: false,
        };
        let _guard = CHILDREN.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(Executor::new().run(&pipeline, &mut |_| None).unwrap(), 5);
    }

    #[test]
    fn background_returns_immediately() {
        assert_eq!(run("sleep 0 &"), 0);
    }
}

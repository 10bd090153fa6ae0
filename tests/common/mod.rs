//! Common test utilities for esh integration tests

#![allow(dead_code, unused_imports)]

pub use esh::shell::NoContinuation;
pub use esh::{lex, parse, ExpansionContext, Registry, Shell};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Tests that fork take this so one test's reaping sweep never collects
/// another test's child
static CHILDREN: Mutex<()> = Mutex::new(());

pub fn serial() -> MutexGuard<'static, ()> {
    CHILDREN.lock().unwrap_or_else(|e| e.into_inner())
}

/// Shell with the native builtins and everything on `$PATH`
pub fn shell() -> Shell {
    Shell::new(Arc::new(Registry::from_env()))
}

/// Run one line with no continuation input
pub fn run(shell: &mut Shell, line: &str) -> Option<i32> {
    shell.execute(line, &mut NoContinuation)
}

/// Command for the built `esh` binary
pub fn esh() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("esh").unwrap()
}

/// Write `body` to `dir/name` and return its path
pub fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

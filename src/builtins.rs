//! Native builtins
//!
//! Each one takes the full argument vector (name first) and returns a
//! status. Builtins that print take the output stream as a parameter so
//! they behave the same in the shell process and in a forked pipeline
//! stage.

use crate::history::History;
use crate::resolver::Registry;
use log::debug;
use std::env;
use std::io::{self, Write};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `cd [DIR]`: with no argument go to `$HOME`, else `/home/$USER`
pub fn cd(argv: &[String]) -> i32 {
    let target = match argv.get(1) {
        Some(dir) => dir.clone(),
        None => match env::var("HOME") {
            Ok(home) => home,
            Err(_) => format!("/home/{}", env::var("USER").unwrap_or_default()),
        },
    };

    match env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(e) => {
            debug!("cd {}: {}", target, e);
            eprintln!(
                "{}: could not cd '{}': no such file or directory",
                argv.first().map(String::as_str).unwrap_or("cd"),
                target
            );
            1
        }
    }
}

/// `export NAME=VALUE...`: arguments without `=` are ignored
pub fn export(argv: &[String]) -> i32 {
    for assignment in argv.iter().skip(1) {
        match assignment.split_once('=') {
            Some((name, value)) if !name.is_empty() => env::set_var(name, value),
            _ => debug!("export: ignoring {:?}", assignment),
        }
    }
    0
}

/// Status requested by `exit [N]`; `atoi` rules, so junk reads as 0
pub fn exit_code(argv: &[String]) -> i32 {
    let arg = match argv.get(1) {
        Some(a) => a.trim_start(),
        None => return 0,
    };
    let (negative, digits) = match arg.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, arg.strip_prefix('+').unwrap_or(arg)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let value = digits[..end]
        .bytes()
        .fold(0i32, |acc, b| acc.wrapping_mul(10).wrapping_add((b - b'0') as i32));
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// `help`: version banner and every described entry
pub fn help(registry: &Registry, out: &mut dyn Write) -> io::Result<i32> {
    writeln!(out, "esh {}", VERSION)?;
    writeln!(out)?;
    writeln!(out, "This shell is not POSIX-compliant, please be careful.")?;
    writeln!(out)?;
    writeln!(out, "Built-in commands:")?;
    for entry in registry.entries() {
        if let Some(description) = &entry.description {
            writeln!(out, " {:<20} - {}", entry.name, description)?;
        }
    }
    Ok(0)
}

/// `history`: every entry with its 1-based index
pub fn history(history: &History, out: &mut dyn Write) -> io::Result<i32> {
    for (i, line) in history.iter().enumerate() {
        writeln!(out, "{}\t{}", i + 1, line)?;
    }
    Ok(0)
}

use esh::builtins::VERSION;
use esh::shell::NoContinuation;
use esh::{Registry, Shell};
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::sync::Arc;

/// Parsed command-line arguments
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub(crate) command: Option<String>,
    pub(crate) script: Option<String>,
    /// Arguments after the script path
    pub(crate) script_args: Vec<String>,
    pub(crate) help: bool,
    pub(crate) version: bool,
    pub(crate) trace: bool,
    /// Unrecognized option or `-c` without a command
    pub(crate) error: Option<String>,
}

/// Parse command-line arguments. Option scanning stops at `-c CMD` or at
/// the first non-option argument, which names a script.
pub(crate) fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs::default();

    let mut i = 1; // Skip program name
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                match args.get(i + 1) {
                    Some(cmd) => cli.command = Some(cmd.clone()),
                    None => cli.error = Some("option requires an argument -- 'c'".to_string()),
                }
                break;
            }
            "-v" | "--version" => cli.version = true,
            "-?" | "-h" | "--help" => cli.help = true,
            "--trace" => cli.trace = true,
            path if !path.starts_with('-') => {
                cli.script = Some(path.to_string());
                cli.script_args = args[i + 1..].to_vec();
                break;
            }
            other => {
                cli.error = Some(format!("unrecognized option '{}'", other));
                break;
            }
        }
        i += 1;
    }

    cli
}

pub(crate) fn print_help(program: &str) {
    println!(
        r#"esh - a small interactive shell, version {}

usage: {} [-c COMMAND] [-v] [-?] [--trace] [SCRIPT [ARGS...]]

 -c     execute one command and exit
 -v     print the version and exit
 -?     show this help text
 --trace
        log everything to stderr (see also ESH_LOG)

With SCRIPT, run it line by line with $0 set to SCRIPT and $1...
set to ARGS. With no arguments, start an interactive session.

STARTUP:
    ~/.eshrc                Run before the first prompt (interactive)
    ~/.esh_history          Command history (interactive)"#,
        VERSION, program
    );
}

pub(crate) fn print_version() {
    println!("esh {}", VERSION);
}

/// Process exit status from a shell status
pub(crate) fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(status_byte(status))
}

fn status_byte(status: i32) -> u8 {
    (status & 0xff) as u8
}

/// `-c CMD`: the command's status becomes the exit status
pub(crate) fn run_command(cmd: &str) -> ExitCode {
    let mut shell = Shell::new(Arc::new(Registry::from_env()));
    let status = shell.execute(cmd, &mut NoContinuation).unwrap_or(0);
    exit_code(shell.exit_requested().unwrap_or(status))
}

/// `SCRIPT ARGS...`: run every line, ignoring individual failures
pub(crate) fn run_script(path: &str, args: &[String]) -> ExitCode {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("esh: {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let mut shell = Shell::new(Arc::new(Registry::from_env()));
    let mut positional = vec![path.to_string()];
    positional.extend(args.iter().cloned());
    shell.ctx.set_positional(positional);

    shell.run_source(BufReader::new(file));
    exit_code(shell.exit_requested().unwrap_or(0))
}

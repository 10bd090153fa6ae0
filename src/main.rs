//! esh - a small interactive command shell
//!
//! Usage:
//!   esh               Start interactive session
//!   esh -c "cmd"      Execute a single command
//!   esh script ARGS   Execute a script file

mod cli;
mod logging;
mod prompt;
mod rcfile;
mod repl;

use cli::{exit_code, parse_args, print_help, print_version, run_command, run_script};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("esh");
    let cli = parse_args(&args);

    logging::init(cli.trace);

    if let Some(err) = &cli.error {
        eprintln!("{}: {}", program, err);
        print_help(program);
        return ExitCode::FAILURE;
    }
    if cli.help {
        print_help(program);
        return ExitCode::SUCCESS;
    }
    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    esh::signals::setup_signal_handlers();

    if let Some(cmd) = &cli.command {
        return run_command(cmd);
    }
    if let Some(script) = &cli.script {
        return run_script(script, &cli.script_args);
    }

    match repl::run_repl() {
        Ok(status) => exit_code(status),
        Err(e) => {
            eprintln!("esh: {}", e);
            ExitCode::FAILURE
        }
    }
}

//! Shell - the central coordinator for esh
//!
//! The Shell owns all interpreter state and runs one line at a time:
//! 1. Resolve `!N` history recall
//! 2. Record the line in history
//! 3. Tokenize with expansion (lexer), pulling continuation lines while a
//!    quote is left open
//! 4. Assemble the pipeline (parser)
//! 5. Run a lone builtin in-process, or fork the pipeline (executor)
//! 6. Update `$?`

use crate::ast::Pipeline;
use crate::builtins;
use crate::executor::{ExecError, Executor};
use crate::history::{should_record, History, RecallError};
use crate::lexer::{lex, LexError};
use crate::parser::parse;
use crate::resolver::{Builtin, Registry};
use crate::state::ExpansionContext;

use log::{debug, warn};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use thiserror::Error;

/// Status after a line that could not be tokenized
pub const SYNTAX_ERROR_STATUS: i32 = 2;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("esh: {0}")]
    Recall(#[from] RecallError),
    #[error("Syntax error: {0}")]
    Syntax(#[from] LexError),
    #[error("esh: {0}")]
    Exec(#[from] ExecError),
}

/// Supplies extra physical lines while a quote is still open
pub trait LineSource {
    /// Next line, or `None` when input is exhausted
    fn continuation(&mut self) -> Option<String>;
}

/// No further input (`-c` mode): an open quote is a syntax error
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContinuation;

impl LineSource for NoContinuation {
    fn continuation(&mut self) -> Option<String> {
        None
    }
}

/// Lines read from a script or rc file
pub struct ReaderSource<R> {
    lines: io::Lines<R>,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource { lines: reader.lines() }
    }

    pub fn next_line(&mut self) -> Option<String> {
        match self.lines.next()? {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("read error: {}", e);
                None
            }
        }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn continuation(&mut self) -> Option<String> {
        self.next_line()
    }
}

/// The shell that owns all state and coordinates execution
pub struct Shell {
    /// `$?` and positional parameters
    pub ctx: ExpansionContext,
    registry: Arc<Registry>,
    history: History,
    executor: Executor,
    /// Set by the `exit` builtin
    exit_request: Option<i32>,
}

impl Shell {
    pub fn new(registry: Arc<Registry>) -> Self {
        Shell {
            ctx: ExpansionContext::new(),
            registry,
            history: History::new(),
            executor: Executor::new(),
            exit_request: None,
        }
    }

    /// Give foreground pipelines their own process group and the terminal
    pub fn enable_job_control(&mut self) {
        self.executor = Executor::with_job_control();
        debug!("job control: {}", self.executor.job_control());
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn last_status(&self) -> i32 {
        self.ctx.last_status
    }

    /// Status passed to `exit`, once it has run
    pub fn exit_requested(&self) -> Option<i32> {
        self.exit_request
    }

    /// Run one logical line. Returns the status of what ran, or `None` when
    /// nothing ran (blank line, empty pipeline, failed recall).
    /// Diagnostics go to stderr.
    pub fn execute(&mut self, line: &str, more: &mut dyn LineSource) -> Option<i32> {
        match self.interpret(line, more) {
            Ok(status) => status,
            Err(e @ ShellError::Recall(_)) => {
                eprintln!("{}", e);
                None
            }
            Err(e @ ShellError::Syntax(_)) => {
                eprintln!("{}", e);
                self.ctx.last_status = SYNTAX_ERROR_STATUS;
                Some(SYNTAX_ERROR_STATUS)
            }
            Err(e @ ShellError::Exec(_)) => {
                eprintln!("{}", e);
                self.ctx.last_status = 1;
                Some(1)
            }
        }
    }

    /// Same as [`execute`](Self::execute), with errors returned rather than
    /// reported
    pub fn interpret(&mut self, line: &str, more: &mut dyn LineSource) -> Result<Option<i32>, ShellError> {
        let mut text = self.history.recall(line)?.to_string();

        let recorded = should_record(&text);
        if recorded {
            self.history.append(text.clone());
        }

        let tokens = loop {
            match lex(&text, &self.ctx) {
                Ok(tokens) => break tokens,
                Err(e @ LexError::UnterminatedQuote) => {
                    let next = more.continuation().ok_or(e)?;
                    text.push('\n');
                    text.push_str(&next);
                    if recorded {
                        self.history.amend_last(text.clone());
                    }
                }
            }
        };

        let pipeline = match parse(tokens) {
            Some(p) => p,
            None => return Ok(None),
        };

        let status = self.run_pipeline(&pipeline)?;
        self.ctx.last_status = status;
        Ok(Some(status))
    }

    /// Run every line from `reader` until it is exhausted or `exit` runs
    pub fn run_source<R: BufRead>(&mut self, reader: R) {
        let mut source = ReaderSource::new(reader);
        while let Some(line) = source.next_line() {
            self.execute(&line, &mut source);
            if self.exit_request.is_some() {
                break;
            }
        }
    }

    fn run_pipeline(&mut self, pipeline: &Pipeline) -> Result<i32, ShellError> {
        if pipeline.is_single() {
            let stage = &pipeline.stages[0];
            if let Some(builtin) = self.registry.lookup(stage.name()) {
                // Redirection and `&` have no effect on an in-process builtin
                if stage.redirect.is_some() || pipeline.background {
                    debug!("{}: redirection/background ignored for builtin", stage.name());
                }
                return Ok(self.run_builtin(builtin, &stage.argv));
            }
        }

        let executor = self.executor;
        let status = executor.run(pipeline, &mut |argv| self.run_named(argv))?;
        Ok(status)
    }

    /// Builtin lookup for a forked stage whose exec failed
    fn run_named(&mut self, argv: &[String]) -> Option<i32> {
        let name = argv.first()?;
        let builtin = self.registry.lookup(name)?;
        Some(self.run_builtin(builtin, argv))
    }

    fn run_builtin(&mut self, builtin: Builtin, argv: &[String]) -> i32 {
        let mut out = io::stdout().lock();
        let result = match builtin {
            Builtin::Cd => Ok(builtins::cd(argv)),
            Builtin::Export => Ok(builtins::export(argv)),
            Builtin::Exit => {
                let code = builtins::exit_code(argv);
                self.exit_request = Some(code);
                Ok(code)
            }
            Builtin::Help => builtins::help(&self.registry, &mut out),
            Builtin::History => builtins::history(&self.history, &mut out),
        };
        let _ = out.flush();
        result.unwrap_or_else(|e| {
            debug!("{}: {}", builtin.name(), e);
            1
        })
    }
}

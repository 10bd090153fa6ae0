//! esh - a small interactive command shell
//!
//! # Overview
//!
//! esh reads a line, expands it, splits it into a pipeline and runs it as
//! child processes:
//!
//! ```text
//! raw line -> lexer -> tokens -> parser -> Pipeline -> executor -> status
//!                                                                    |
//!                                              `$?` <----------------+
//! ```
//!
//! # Syntax
//!
//! ```text
//! echo 'single' "double $HOME"   # quoting, expansion inside double quotes
//! echo $? $0 $1 ${NAME}          # status, positional, environment
//! ls *.rs                        # one wildcard per argument, current dir
//! ls | wc -l > count             # pipes, truncate redirect
//! date >> log &                  # append redirect, background
//! !3                             # re-run history entry 3
//! ```
//!
//! Tab completion ([`completion`]) shares the lexer's word splitting but
//! otherwise runs independently of execution.
//!
//! # Example
//!
//! ```rust,no_run
//! use esh::{Registry, Shell};
//! use esh::shell::NoContinuation;
//! use std::sync::Arc;
//!
//! let mut shell = Shell::new(Arc::new(Registry::from_env()));
//! let status = shell.execute("echo hello | tr a-z A-Z", &mut NoContinuation);
//! assert_eq!(status, Some(0));
//! ```

pub mod ast;
pub mod builtins;
pub mod completion;
pub mod executor;
pub mod history;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod shell;
pub mod signals;
pub mod state;

// Re-export commonly used items
pub use ast::{Pipeline, Redirect, RedirectMode, Stage};
pub use completion::{Completer, Completion};
pub use executor::{ExecError, Executor};
pub use history::{History, RecallError};
pub use lexer::{lex, LexError, Token};
pub use parser::parse;
pub use resolver::{Builtin, Registry};
pub use shell::{LineSource, Shell, ShellError};
pub use state::ExpansionContext;

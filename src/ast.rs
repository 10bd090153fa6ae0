//! Assembled command structure for esh
//!
//! A line becomes a [`Pipeline`]: one or more [`Stage`]s joined by pipes,
//! with at most one output redirection on the last stage.

use std::path::PathBuf;

/// How a redirection target is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`: create or truncate
    Truncate,
    /// `>>`: create or append
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: PathBuf,
    pub mode: RedirectMode,
}

/// One command within a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Never empty once assembled
    pub argv: Vec<String>,
    pub redirect: Option<Redirect>,
}

impl Stage {
    pub fn new(argv: Vec<String>) -> Self {
        Stage { argv, redirect: None }
    }

    /// Command name (first argument)
    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// At least one stage
    pub stages: Vec<Stage>,
    /// Trailing `&`: do not wait for the pipeline
    pub background: bool,
}

impl Pipeline {
    pub fn is_single(&self) -> bool {
        self.stages.len() == 1
    }

    /// Redirection attached to the last stage, if any
    pub fn redirect(&self) -> Option<&Redirect> {
        self.stages.last().and_then(|s| s.redirect.as_ref())
    }
}

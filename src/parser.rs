//! Pipeline assembly for esh
//!
//! Converts a token sequence into a [`Pipeline`]: splits stages at pipes,
//! collapses `>` `>` into an append redirection, resolves wildcard
//! arguments against a directory listing and strips a trailing `&`.
//! Nothing here reports errors; a line that cannot form a runnable
//! pipeline simply yields `None`.

use crate::ast::{Pipeline, Redirect, RedirectMode, Stage};
use crate::lexer::Token;
use glob::{MatchOptions, Pattern};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Parser state
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    /// Directory wildcards are resolved against
    dir: &'a Path,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, dir: &'a Path) -> Self {
        Parser { tokens, pos: 0, dir }
    }

    /// Peek at the current token without consuming it
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Consume and return the current token
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Assemble the whole token sequence
    pub fn parse(&mut self) -> Option<Pipeline> {
        if self.tokens.is_empty() {
            return None;
        }

        let mut stages: Vec<Vec<String>> = vec![Vec::new()];
        let mut redirect = None;

        while let Some(token) = self.advance() {
            let argv = stages.last_mut()?;
            match token {
                Token::Word(word) => argv.push(word),
                Token::Wildcard { prefix, suffix } => {
                    argv.extend(expand_wildcard(self.dir, &prefix, &suffix));
                }
                Token::Pipe => stages.push(Vec::new()),
                Token::Redirect => {
                    if let Some(r) = self.redirect_target() {
                        redirect = Some(r);
                    }
                }
            }
        }

        let mut background = false;
        if let Some(last) = stages.last_mut() {
            if last.last().map(String::as_str) == Some("&") {
                last.pop();
                background = true;
            }
        }

        if stages.iter().any(Vec::is_empty) {
            debug!("empty stage in pipeline, nothing to run");
            return None;
        }

        let mut stages: Vec<Stage> = stages.into_iter().map(Stage::new).collect();
        if let Some(last) = stages.last_mut() {
            last.redirect = redirect;
        }

        Some(Pipeline { stages, background })
    }

    /// Called just after a `>`: collapse a following `>` into append mode
    /// and consume the target argument.
    fn redirect_target(&mut self) -> Option<Redirect> {
        let mut mode = RedirectMode::Truncate;
        while self.peek() == Some(&Token::Redirect) {
            self.advance();
            mode = RedirectMode::Append;
        }

        let path = match self.peek() {
            Some(Token::Word(word)) => PathBuf::from(word),
            Some(Token::Wildcard { prefix, suffix }) => PathBuf::from(format!("{}*{}", prefix, suffix)),
            _ => {
                debug!("redirection without a target ignored");
                return None;
            }
        };
        self.advance();
        Some(Redirect { path, mode })
    }
}

/// Assemble tokens, resolving wildcards in the current directory
pub fn parse(tokens: Vec<Token>) -> Option<Pipeline> {
    Parser::new(tokens, Path::new(".")).parse()
}

/// Assemble tokens, resolving wildcards in `dir`
pub fn parse_in(tokens: Vec<Token>, dir: &Path) -> Option<Pipeline> {
    Parser::new(tokens, dir).parse()
}

/// Resolve `prefix*suffix` against the entries of `dir`.
///
/// Hidden entries never match. A prefix naming another directory is not
/// expanded, and a pattern with no matches stays as its literal text.
/// Matches are returned sorted.
pub fn expand_wildcard(dir: &Path, prefix: &str, suffix: &str) -> Vec<String> {
    let literal = format!("{}*{}", prefix, suffix);
    if prefix.contains('/') {
        return vec![literal];
    }

    let pattern = match Pattern::new(&format!("{}*{}", Pattern::escape(prefix), Pattern::escape(suffix))) {
        Ok(p) => p,
        Err(_) => return vec![literal],
    };
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!("wildcard: cannot list {}: {}", dir.display(), e);
            return vec![literal];
        }
    };

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let mut matches: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.') && pattern.matches_with(name, options))
        .collect();

    if matches.is_empty() {
        return vec![literal];
    }
    matches.sort();
    matches
}

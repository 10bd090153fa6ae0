//! Command history for esh
//!
//! Every accepted line is appended verbatim before it is tokenized, and a
//! line of the form `!N` is replaced by the N-th stored entry (1-indexed).

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Entries kept in the history file
pub const HISTORY_FILE_LIMIT: usize = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecallError {
    #[error("!{0}: event not found")]
    EventNotFound(i64),
}

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    /// Replace the most recent entry (used when a continuation line
    /// completes an unterminated quote)
    pub fn amend_last(&mut self, line: impl Into<String>) {
        match self.entries.last_mut() {
            Some(last) => *last = line.into(),
            None => self.entries.push(line.into()),
        }
    }

    /// Entry `n`, counting from 1
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Resolve `!N` recall. Lines not starting with `!` come back as-is.
    pub fn recall<'a>(&'a self, line: &'a str) -> Result<&'a str, RecallError> {
        let Some(rest) = line.strip_prefix('!') else {
            return Ok(line);
        };
        let n = leading_number(rest);
        usize::try_from(n)
            .ok()
            .and_then(|i| self.get(i))
            .ok_or(RecallError::EventNotFound(n))
    }

    /// Load entries from a file, one per line. A missing file is not an error.
    pub fn load(&mut self, path: &Path) -> io::Result<()> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        self.entries
            .extend(content.lines().filter(|l| !l.is_empty()).map(String::from));
        Ok(())
    }

    /// Save the most recent single-line entries, one per line
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let lines: Vec<&str> = self.iter().filter(|l| !l.contains('\n')).collect();
        let start = lines.len().saturating_sub(HISTORY_FILE_LIMIT);
        let mut file = fs::File::create(path)?;
        for line in &lines[start..] {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

/// Whether a line should be recorded: lines starting with a space and
/// blank lines are not
pub fn should_record(line: &str) -> bool {
    !(line.is_empty() || line.starts_with(' ') || line == "\n")
}

/// `atoi`-style parse: optional sign, then leading digits, 0 if none
fn leading_number(s: &str) -> i64 {
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(if end == 0 { 0 } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(lines: &[&str]) -> History {
        let mut h = History::new();
        for l in lines {
            h.append(*l);
        }
        h
    }

    #[test]
    fn get_is_one_indexed() {
        let h = history(&["first", "second"]);
        assert_eq!(h.get(1), Some("first"));
        assert_eq!(h.get(2), Some("second"));
        assert_eq!(h.get(0), None);
        assert_eq!(h.get(3), None);
    }

    #[test]
    fn recall_entry() {
        let h = history(&["echo hi"]);
        assert_eq!(h.recall("!1"), Ok("echo hi"));
        assert_eq!(h.recall("ls"), Ok("ls"));
    }

    #[test]
    fn recall_out_of_range() {
        let h = history(&["echo hi"]);
        assert_eq!(h.recall("!99"), Err(RecallError::EventNotFound(99)));
        assert_eq!(h.recall("!"), Err(RecallError::EventNotFound(0)));
        assert_eq!(h.recall("!-1"), Err(RecallError::EventNotFound(-1)));
        assert_eq!(
            RecallError::EventNotFound(99).to_string(),
            "!99: event not found"
        );
    }

    #[test]
    fn recall_ignores_trailing_text() {
        let h = history(&["pwd", "ls"]);
        assert_eq!(h.recall("!2abc"), Ok("ls"));
    }

    #[test]
    fn record_filter() {
        assert!(should_record("ls"));
        assert!(!should_record(" ls"));
        assert!(!should_record(""));
        assert!(!should_record("\n"));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        let h = history(&["one", "two\nlines", "three"]);
        h.save(&path).unwrap();

        let mut loaded = History::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.iter().collect::<Vec<_>>(), vec!["one", "three"]);

        let mut missing = History::new();
        missing.load(&dir.path().join("nope")).unwrap();
        assert!(missing.is_empty());
    }
}

//! Tab completion for esh
//!
//! The word under the cursor is completed in one of three modes:
//! - command: first word (after an optional `sudo`/`gsudo`) with no `/`,
//!   matched against the registry
//! - keyword: arguments of a command with a fixed keyword table
//! - file: everything else, matched against a directory listing
//!
//! One match is inserted outright. Several matches extend the word to their
//! longest common prefix; when there is nothing left to extend, a repeated
//! tab press lists them.

use crate::lexer::word_spans;
use crate::resolver::Registry;
use std::fs;
use std::path::{Path, PathBuf};

/// Words that run the following command with elevated privileges
pub const PRIVILEGE_WRAPPERS: [&str; 2] = ["sudo", "gsudo"];

/// Commands whose arguments come from a fixed table
pub const KEYWORD_TABLES: [(&str, &[&str]); 1] = [("term-set", &["scale", "size", "gamma", "sdf", "alpha"])];

/// What the line editor should do in response to a tab press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Nothing,
    /// Insert this text at the cursor
    Insert(String),
    /// Show these candidates below the prompt
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    text: String,
    is_dir: bool,
}

/// The word being completed
struct Word<'a> {
    /// Index among the line's words, after any privilege wrapper
    index: usize,
    /// Text from the start of the word to the cursor
    prefix: &'a str,
    at_end: bool,
}

pub struct Completer<'a> {
    registry: &'a Registry,
    /// Relative paths are listed against this directory
    base: PathBuf,
}

impl<'a> Completer<'a> {
    /// Completer that resolves relative paths against the current directory
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_base(registry, ".")
    }

    pub fn with_base(registry: &'a Registry, base: impl Into<PathBuf>) -> Self {
        Completer {
            registry,
            base: base.into(),
        }
    }

    /// Complete the word at byte offset `pos` of `line`. `repeated` is true
    /// when the previous tab press left the line and cursor unchanged.
    pub fn complete(&self, line: &str, pos: usize, repeated: bool) -> Completion {
        let pos = pos.min(line.len());
        if !line.is_char_boundary(pos) {
            return Completion::Nothing;
        }

        let spans = word_spans(line);
        let words: Vec<&str> = spans.iter().map(|r| &line[r.clone()]).collect();
        let word = match spans.iter().position(|r| r.start <= pos && pos <= r.end) {
            Some(i) => Word {
                index: i,
                prefix: &line[spans[i].start..pos],
                at_end: pos == spans[i].end,
            },
            None => Word {
                index: spans.iter().filter(|r| r.end < pos).count(),
                prefix: "",
                at_end: true,
            },
        };

        let mut command = 0;
        let mut index = word.index;
        if index > 0 && words.first().map_or(false, |w| PRIVILEGE_WRAPPERS.contains(w)) {
            index -= 1;
            command = 1;
        }

        let (candidates, typed) = if index == 0 && !word.prefix.contains('/') {
            (self.commands(word.prefix), word.prefix)
        } else if let Some(keywords) = words.get(command).and_then(|w| keyword_table(w)).filter(|_| index >= 1) {
            (keyword_candidates(keywords, word.prefix), word.prefix)
        } else {
            let typed = match word.prefix.rfind('/') {
                Some(slash) => &word.prefix[slash + 1..],
                None => word.prefix,
            };
            (self.files(word.prefix), typed)
        };

        resolve(candidates, typed, word.at_end, repeated)
    }

    fn commands(&self, prefix: &str) -> Vec<Candidate> {
        let mut names: Vec<&str> = self.registry.list_for_completion(prefix).collect();
        names.dedup();
        names
            .into_iter()
            .map(|n| Candidate {
                text: n.to_string(),
                is_dir: false,
            })
            .collect()
    }

    /// Entries of the directory named by `prefix` up to its last `/`
    fn files(&self, prefix: &str) -> Vec<Candidate> {
        let (dir, name) = match prefix.rfind('/') {
            Some(0) => (PathBuf::from("/"), &prefix[1..]),
            Some(slash) => (self.base.join(&prefix[..slash]), &prefix[slash + 1..]),
            None => (self.base.clone(), prefix),
        };
        list_dir(&dir, name)
    }
}

fn keyword_table(command: &str) -> Option<&'static [&'static str]> {
    KEYWORD_TABLES
        .iter()
        .find(|(name, _)| *name == command)
        .map(|(_, keywords)| *keywords)
}

fn keyword_candidates(keywords: &[&str], prefix: &str) -> Vec<Candidate> {
    keywords
        .iter()
        .filter(|k| k.starts_with(prefix))
        .map(|k| Candidate {
            text: k.to_string(),
            is_dir: false,
        })
        .collect()
}

/// Visible entries of `dir` starting with `name`, sorted. Directories get a
/// trailing `/`; symlinks are not followed.
fn list_dir(dir: &Path, name: &str) -> Vec<Candidate> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("complete: cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut found: Vec<Candidate> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let file_name = e.file_name().into_string().ok()?;
            if file_name.starts_with('.') || !file_name.starts_with(name) {
                return None;
            }
            let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let text = if is_dir { format!("{}/", file_name) } else { file_name };
            Some(Candidate { text, is_dir })
        })
        .collect();
    found.sort_by(|a, b| a.text.cmp(&b.text));
    found
}

fn resolve(candidates: Vec<Candidate>, typed: &str, at_end: bool, repeated: bool) -> Completion {
    match candidates.len() {
        0 => Completion::Nothing,
        1 => {
            let only = &candidates[0];
            let mut rest = only.text.get(typed.len()..).unwrap_or("").to_string();
            if at_end && !only.is_dir && !rest.is_empty() {
                rest.push(' ');
            }
            if rest.is_empty() {
                Completion::Nothing
            } else {
                Completion::Insert(rest)
            }
        }
        _ => {
            let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
            let common = common_prefix(&texts);
            match common.get(typed.len()..) {
                Some(extension) if !extension.is_empty() => Completion::Insert(extension.to_string()),
                _ if repeated => Completion::List(texts.into_iter().map(String::from).collect()),
                _ => Completion::Nothing,
            }
        }
    }
}

/// Longest prefix shared by every item, cut back to a char boundary
fn common_prefix<'s>(items: &[&'s str]) -> &'s str {
    let first = match items.first() {
        Some(f) => *f,
        None => return "",
    };
    let mut end = first.len();
    for item in &items[1..] {
        end = end.min(
            first
                .bytes()
                .zip(item.bytes())
                .take_while(|(a, b)| a == b)
                .count(),
        );
    }
    while !first.is_char_boundary(end) {
        end -= 1;
    }
    &first[..end]
}

/// Candidate list as shown below the prompt
pub fn format_list(items: &[String]) -> String {
    items.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn registry(names: &[&str]) -> Registry {
        Registry::from_names(names.iter().copied())
    }

    fn insert(s: &str) -> Completion {
        Completion::Insert(s.to_string())
    }

    fn list(items: &[&str]) -> Completion {
        Completion::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn single_command_completes_with_space() {
        let reg = registry(&["cat", "cp"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("ca", 2, false), insert("t "));
    }

    #[test]
    fn ambiguous_prefix_lists_on_second_tab() {
        let reg = registry(&["cat", "cp"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("c", 1, false), Completion::Nothing);
        assert_eq!(c.complete("c", 1, true), list(&["cat", "cp"]));
        assert_eq!(format_list(&["cat".into(), "cp".into()]), "cat, cp");
    }

    #[test]
    fn three_way_listing() {
        let reg = registry(&["cd", "cat", "cp"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("c", 1, false), Completion::Nothing);
        assert_eq!(c.complete("c", 1, true), list(&["cat", "cd", "cp"]));
    }

    #[test]
    fn common_prefix_extends() {
        let reg = registry(&["export", "expand", "exit"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("e", 1, false), insert("x"));
        assert_eq!(c.complete("exp", 3, false), Completion::Nothing);
    }

    #[test]
    fn common_prefix_is_inserted() {
        let reg = registry(&["grep", "groups", "grub-install", "grub-mkconfig"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("gru", 3, false), insert("b-"));
        assert_eq!(c.complete("grub-", 5, false), Completion::Nothing);
        assert_eq!(c.complete("grub-", 5, true), list(&["grub-install", "grub-mkconfig"]));
    }

    #[test]
    fn duplicate_names_count_once() {
        let reg = registry(&["ls", "ls", "lsblk"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("lsb", 3, false), insert("lk "));
        assert_eq!(c.complete("ls", 2, true), list(&["ls", "lsblk"]));
    }

    #[test]
    fn no_candidates() {
        let reg = registry(&["cat"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("zz", 2, true), Completion::Nothing);
    }

    #[test]
    fn privilege_wrapper_is_skipped() {
        let reg = registry(&["cat", "sudo"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("sudo ca", 7, false), insert("t "));
        assert_eq!(c.complete("gsudo ca", 8, false), insert("t "));
    }

    #[test]
    fn keyword_mode() {
        let reg = registry(&["term-set"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("term-set sc", 11, false), insert("ale "));
        assert_eq!(c.complete("term-set s", 10, true), list(&["scale", "size", "sdf"]));
        assert_eq!(c.complete("sudo term-set al", 16, false), insert("pha "));
        assert_eq!(c.complete("gsudo term-set ga", 17, false), insert("mma "));
    }

    #[test]
    fn file_mode_lists_directory() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(dir.path().join("numbers.csv")).unwrap();
        File::create(dir.path().join(".nothing")).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();

        let reg = registry(&["cat"]);
        let c = Completer::with_base(&reg, dir.path());
        assert_eq!(c.complete("cat no", 6, false), insert("tes.txt "));
        assert_eq!(c.complete("cat n", 5, false), Completion::Nothing);
        assert_eq!(c.complete("cat n", 5, true), list(&["notes.txt", "numbers.csv"]));
        // directories get a slash and no trailing space
        assert_eq!(c.complete("cat sr", 6, false), insert("c/"));
    }

    #[test]
    fn file_mode_with_directory_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        File::create(dir.path().join("src").join("main.rs")).unwrap();

        let reg = registry(&["cat"]);
        let c = Completer::with_base(&reg, dir.path());
        assert_eq!(c.complete("cat src/ma", 10, false), insert("in.rs "));

        let abs = format!("cat {}/src/m", dir.path().display());
        assert_eq!(c.complete(&abs, abs.len(), false), insert("ain.rs "));
    }

    #[test]
    fn slash_in_first_word_uses_files() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("run.sh")).unwrap();
        let reg = registry(&["rustc"]);
        let c = Completer::with_base(&reg, dir.path());
        assert_eq!(c.complete("./ru", 4, false), insert("n.sh "));
    }

    #[test]
    fn cursor_inside_word_gets_no_space() {
        let reg = registry(&["cat", "cp"]);
        let c = Completer::new(&reg);
        assert_eq!(c.complete("cafoo", 2, false), insert("t"));
    }

    #[test]
    fn new_word_after_separator() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("only")).unwrap();
        let reg = registry(&["cat"]);
        let c = Completer::with_base(&reg, dir.path());
        assert_eq!(c.complete("cat ", 4, false), insert("only "));
    }

    #[test]
    fn prefix_respects_char_boundaries() {
        assert_eq!(common_prefix(&["héllo", "hèllo"]), "h");
        assert_eq!(common_prefix(&["abc", "abd"]), "ab");
        assert_eq!(common_prefix(&[]), "");
    }
}

//! Builtin registry
//!
//! Holds every command name the shell knows about:
//! 1. The native builtins (`cd`, `exit`, `export`, `help`, `history`)
//! 2. Every name found by listing the `PATH` directories
//!
//! Path-scanned entries carry no callable; they exist so tab completion can
//! offer them. The registry is populated once through [`RegistryBuilder`],
//! sorted, and never changes afterwards.

use log::debug;
use std::env;
use std::fs;
use std::path::Path;

/// Search path used when `PATH` is unset
pub const DEFAULT_PATH: &str = "/bin";

/// Commands implemented inside the shell process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
    Export,
    Help,
    History,
}

impl Builtin {
    /// Registration order
    pub const ALL: [Builtin; 5] = [
        Builtin::Cd,
        Builtin::Exit,
        Builtin::Export,
        Builtin::Help,
        Builtin::History,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cd => "cd",
            Builtin::Exit => "exit",
            Builtin::Export => "export",
            Builtin::Help => "help",
            Builtin::History => "history",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Builtin::Cd => "change directory",
            Builtin::Exit => "exit the shell",
            Builtin::Export => "set environment variables",
            Builtin::Help => "display this help text",
            Builtin::History => "list command history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// `None` for names discovered on the search path
    pub builtin: Option<Builtin>,
    /// Shown by `help`; only native builtins have one
    pub description: Option<String>,
}

/// Collects entries before the registry is frozen
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entry. Duplicate names are allowed; lookup takes the
    /// first one registered.
    pub fn register(&mut self, name: impl Into<String>, builtin: Option<Builtin>, description: Option<&str>) -> &mut Self {
        self.entries.push(Entry {
            name: name.into(),
            builtin,
            description: description.map(String::from),
        });
        self
    }

    /// Register the native builtins
    pub fn natives(&mut self) -> &mut Self {
        for builtin in Builtin::ALL {
            self.register(builtin.name(), Some(builtin), Some(builtin.description()));
        }
        self
    }

    /// Register every visible name in each directory of a colon-separated
    /// search path. Unreadable directories are skipped.
    pub fn scan_path(&mut self, path_list: &str) -> &mut Self {
        for dir in path_list.split(':').filter(|d| !d.is_empty()) {
            self.scan_dir(Path::new(dir));
        }
        self
    }

    /// Register every visible name in one directory
    pub fn scan_dir(&mut self, dir: &Path) -> &mut Self {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                debug!("registry: skipping {}: {}", dir.display(), e);
                return self;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if let Ok(name) = entry.file_name().into_string() {
                if !name.starts_with('.') {
                    self.register(name, None, None);
                }
            }
        }
        self
    }

    /// Sort by name and freeze. The sort is stable, so among duplicate
    /// names the earlier registration still comes first.
    pub fn build(&mut self) -> Registry {
        let mut entries = std::mem::take(&mut self.entries);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("registry: {} entries", entries.len());
        Registry { entries }
    }
}

/// Immutable name -> builtin table
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Native builtins plus everything on `$PATH` (or [`DEFAULT_PATH`])
    pub fn from_env() -> Self {
        let path = env::var("PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        Self::builder().natives().scan_path(&path).build()
    }

    /// Registry over a fixed set of names without callables (for testing)
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::builder();
        for name in names {
            builder.register(name, None, None);
        }
        builder.build()
    }

    /// Callable registered under `name`, if the first entry with that name
    /// has one
    pub fn lookup(&self, name: &str) -> Option<Builtin> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.builtin)
    }

    /// Every registered name starting with `prefix`, in registry order
    pub fn list_for_completion<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(move |name| name.starts_with(prefix))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Expansion state shared by every line the interpreter runs
//!
//! Tracks what `$` expansion can see:
//! - `$?` - exit status of the previous command
//! - `$0`, `$1`, ... - positional parameters (script path and arguments)
//! - `$NAME` / `${NAME}` - environment lookup

use std::collections::HashMap;
use std::env;

/// Read-only name -> value lookup consulted during `$NAME` expansion
pub trait Environment {
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Process-wide expansion context
pub struct ExpansionContext {
    /// Exit status of the last command that actually ran
    pub last_status: i32,
    /// Positional parameters, index-addressable from `$0`
    pub positional: Vec<String>,
    env: Box<dyn Environment>,
}

impl Default for ExpansionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpansionContext {
    /// Context backed by the process environment, no positional parameters
    pub fn new() -> Self {
        Self::with_env(ProcessEnv)
    }

    /// Context backed by a custom environment (tests, embedding)
    pub fn with_env(env: impl Environment + 'static) -> Self {
        ExpansionContext {
            last_status: 0,
            positional: Vec::new(),
            env: Box::new(env),
        }
    }

    pub fn set_positional(&mut self, params: Vec<String>) {
        self.positional = params;
    }

    /// Resolve a variable name to its expansion text.
    ///
    /// `?` is the last exit status, an all-digit name is a positional
    /// parameter (empty when out of range), anything else is looked up in
    /// the environment (empty when unset).
    pub fn resolve(&self, name: &str) -> String {
        if name == "?" {
            return self.last_status.to_string();
        }
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            return name
                .parse::<usize>()
                .ok()
                .and_then(|i| self.positional.get(i))
                .cloned()
                .unwrap_or_default();
        }
        self.env.get(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExpansionContext {
        let mut vars = HashMap::new();
        vars.insert("HOME".to_string(), "/home/kay".to_string());
        let mut ctx = ExpansionContext::with_env(vars);
        ctx.set_positional(vec!["script.sh".into(), "one".into(), "two".into()]);
        ctx
    }

    #[test]
    fn resolve_status() {
        let mut ctx = ctx();
        ctx.last_status = 42;
        assert_eq!(ctx.resolve("?"), "42");
    }

    #[test]
    fn resolve_positional() {
        let ctx = ctx();
        assert_eq!(ctx.resolve("0"), "script.sh");
        assert_eq!(ctx.resolve("2"), "two");
        assert_eq!(ctx.resolve("3"), "");
    }

    #[test]
    fn resolve_env() {
        let ctx = ctx();
        assert_eq!(ctx.resolve("HOME"), "/home/kay");
        assert_eq!(ctx.resolve("NOPE"), "");
    }
}

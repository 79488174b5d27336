use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Shell-side view of the process environment.
///
/// Variables are snapshotted at startup; the working directory is tracked
/// here and mutated only by the `cd` builtin. `should_exit` is the REPL's
/// termination flag, set by `exit 0`.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Environment {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The search path consulted for external command resolution.
    pub fn search_path(&self) -> Option<String> {
        self.get_var("PATH").filter(|p| !p.is_empty())
    }

    /// Target of `cd` with no argument (or `~`).
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME").map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_var_overrides_snapshot() {
        let mut env = Environment::new();
        env.set_var("MINISHELL_TEST_VAR", "42");
        assert_eq!(env.get_var("MINISHELL_TEST_VAR").as_deref(), Some("42"));
    }

    #[test]
    fn empty_path_counts_as_absent() {
        let mut env = Environment::new();
        env.set_var("PATH", "");
        assert!(env.search_path().is_none());
    }

    #[test]
    fn home_dir_reads_home_var() {
        let mut env = Environment::new();
        env.set_var("HOME", "/tmp/somewhere");
        assert_eq!(env.home_dir(), Some(PathBuf::from("/tmp/somewhere")));
    }
}

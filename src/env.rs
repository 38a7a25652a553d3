use crate::alias::AliasTable;
use crate::command::ExitCode;
use crate::jobs::JobTable;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable state of one interpreter, passed explicitly to everything that
/// runs a command.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: a flag that the REPL loop checks to know when to terminate.
/// - `last_status`: exit code of the last foreground command, shown in the prompt.
/// - `aliases` and `jobs`: the alias table and the background job table.
/// - `history`: lines entered in this session, oldest first.
#[derive(Debug)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
    pub last_status: ExitCode,
    pub aliases: AliasTable,
    pub jobs: JobTable,
    pub history: Vec<String>,
    /// Maximum number of lines kept in `history`.
    pub history_size: usize,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`. Tables and history start empty.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
            last_status: 0,
            aliases: AliasTable::new(),
            jobs: JobTable::new(),
            history: Vec::new(),
            history_size: 100,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Record an entered line, dropping the oldest once `history_size` is reached.
    pub fn push_history(&mut self, line: impl Into<String>) {
        if self.history_size == 0 {
            return;
        }
        if self.history.len() >= self.history_size {
            let excess = self.history.len() + 1 - self.history_size;
            self.history.drain(..excess);
        }
        self.history.push(line.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::new();
        env.vars.clear();

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut env = Environment::new();
        env.history_size = 3;
        for line in ["a", "b", "c", "d", "e"] {
            env.push_history(line);
        }
        assert_eq!(env.history, ["c", "d", "e"]);
    }

    #[test]
    fn test_history_disabled() {
        let mut env = Environment::new();
        env.history_size = 0;
        env.push_history("ls");
        assert!(env.history.is_empty());
    }
}

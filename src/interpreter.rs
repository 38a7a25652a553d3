use crate::alias;
use crate::builtin::Cd;
use crate::command::{CommandFactory, ExitCode};
use crate::config::Config;
use crate::env::Environment;
use crate::error::ShellError;
use crate::launcher::{self, LaunchResult};
use crate::lexer::{self, Operator, Token};
use crate::pipeline;
use crate::redirect;
use crate::registry::{BuiltinRegistry, Factory};
use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};
use std::io::{self, Write};

/// An interactive command interpreter.
///
/// The interpreter owns an [`Environment`] (variables, working directory,
/// aliases, background jobs, history) and a [`BuiltinRegistry`]. Each line goes
/// through tokenizing, alias expansion and background-marker removal, then runs
/// as a two-stage pipeline, a builtin or an external program.
///
/// Example
/// ```
/// use cellsh::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let code = sh.execute_line_to("echo hello world", &mut out);
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    registry: BuiltinRegistry,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of builtins.
    pub fn new(registry: BuiltinRegistry) -> Self {
        Self {
            env: Environment::new(),
            registry,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Install startup aliases and settings.
    pub fn configure(&mut self, config: &Config) {
        config.apply(&mut self.env);
    }

    /// Execute one line, builtin output going to the process stdout.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        self.execute_line_to(line, &mut io::stdout())
    }

    /// Execute one line and return its status, which also becomes the last
    /// status. Builtins write to `out`; external programs inherit the
    /// process stdout unless redirected. An empty line changes nothing.
    pub fn execute_line_to(&mut self, line: &str, out: &mut dyn Write) -> ExitCode {
        let tokens = lexer::split_into_tokens(line);
        if tokens.is_empty() {
            return self.env.last_status;
        }
        let status = match self.execute_tokens(tokens, out) {
            Ok(status) => status,
            Err(e) => {
                warn!("{line:?}: {e}");
                eprintln!("cellsh: {e}");
                e.status()
            }
        };
        self.env.last_status = status;
        status
    }

    fn execute_tokens(
        &mut self,
        tokens: Vec<Token>,
        out: &mut dyn Write,
    ) -> std::result::Result<ExitCode, ShellError> {
        if tokens[0].as_word() == Some("cd") {
            return Ok(self.change_dir(&tokens[1..], out));
        }

        let tokens = alias::expand(tokens, &self.env.aliases)?;
        let (tokens, background) = strip_background(tokens);
        if tokens.is_empty() {
            return Err(ShellError::MissingCommand);
        }

        let has_pipe = tokens.contains(&Token::Operator(Operator::Pipe));
        if has_pipe {
            debug!("running as pipeline");
            let result = pipeline::run_pipeline(tokens, background, &mut self.env)?;
            return Ok(self.report(result, out));
        }

        if !redirect::has_redirection(&tokens) {
            if let Some(status) = self.run_builtin(&tokens, out) {
                return Ok(status);
            }
        }

        let (argv, plan) = redirect::plan(tokens)?;
        let result = launcher::launch(argv, &plan, background, &mut self.env)?;
        Ok(self.report(result, out))
    }

    fn run_builtin(&mut self, tokens: &[Token], out: &mut dyn Write) -> Option<ExitCode> {
        let argv: Vec<String> = tokens.iter().map(Token::to_string).collect();
        let name = argv.first()?.clone();
        if !self.registry.contains(&name) {
            return None;
        }
        let result = self
            .registry
            .dispatch(&argv, &mut io::stdin(), out, &mut self.env)?;
        let status = result.unwrap_or_else(|e| {
            warn!("{name}: {e:#}");
            let _ = writeln!(out, "{name}: {e:#}");
            1
        });
        if status != 0 && name != "exit" {
            let _ = writeln!(out, "{name} failed");
        }
        Some(status)
    }

    /// `cd` runs before alias expansion and ignores operators.
    fn change_dir(&mut self, args: &[Token], out: &mut dyn Write) -> ExitCode {
        let args: Vec<String> = args.iter().map(Token::to_string).collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let Some(cmd) = Factory::<Cd>::default().try_create(&self.env, "cd", &args) else {
            return 1;
        };
        match cmd.execute(&mut io::stdin(), out, &mut self.env) {
            Ok(status) => status,
            Err(e) => {
                let _ = writeln!(out, "cd: {e:#}");
                1
            }
        }
    }

    fn report(&self, result: LaunchResult, out: &mut dyn Write) -> ExitCode {
        match result {
            LaunchResult::Exited(code) => code,
            LaunchResult::Background(pids) => {
                for pid in pids {
                    let _ = writeln!(out, "[{pid}]");
                }
                0
            }
        }
    }

    /// `[cwd] > `, or `[cwd][status] > ` after a failure.
    pub fn prompt(&self) -> String {
        let cwd = self.env.current_dir.display();
        match self.env.last_status {
            0 => format!("[{cwd}] > "),
            status => format!("[{cwd}][{status}] > "),
        }
    }

    /// Read-Eval-Print Loop: runs until `exit` or end of input.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                        self.env.push_history(line.as_str());
                    }
                    self.execute_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// An interpreter with every builtin, see [`BuiltinRegistry::default`].
    fn default() -> Self {
        Self::new(BuiltinRegistry::default())
    }
}

/// Remove a trailing `&`, either standing alone or glued to the last word.
fn strip_background(mut tokens: Vec<Token>) -> (Vec<Token>, bool) {
    let Some(Token::Word(last)) = tokens.last_mut() else {
        return (tokens, false);
    };
    if last == "&" {
        tokens.pop();
        return (tokens, true);
    }
    match last.strip_suffix('&') {
        Some(rest) => {
            *last = rest.to_string();
            (tokens, true)
        }
        None => (tokens, false),
    }
}

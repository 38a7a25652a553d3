use crate::alias;
use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::registry::Factory;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use nix::sys::signal::Signal;
use nix::unistd::{User, getuid};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::SystemTime;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "jobs".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdin, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{}: {e:#}", T::name())?;
                Ok(1)
            }
        }
    }
}

/// Usage text or a parse error produced by argh instead of a command.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Err(anyhow!("no target and HOME not set")),
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        env.set_var("PWD", canonical.to_string_lossy());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell.
pub struct Exit {
    #[argh(positional)]
    /// status to exit with; 0 when omitted.
    pub code: Option<ExitCode>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(self.code.unwrap_or(0))
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the shell's variables as NAME=value, sorted by name.
pub struct Env {}

impl BuiltinCommand for Env {
    fn name() -> &'static str {
        "env"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let mut vars: Vec<_> = env.vars.iter().collect();
        vars.sort();
        for (key, value) in vars {
            writeln!(stdout, "{key}={value}")?;
        }
        Ok(0)
    }
}

const HELP_TEXT: &str = "\
Builtins:
  addpath <dir>         append a directory to PATH
  alias [name[=value]]  define or show aliases
  cd [dir]              change directory ($HOME when omitted)
  echo [-n] [args...]   print arguments
  env                   print variables
  exit [code]           leave the shell
  fg <pid>              resume a job and wait for it
  help                  show this text
  history               list entered lines
  jobs [-c]             list background jobs, -c drops finished ones
  kill <pid> [signal]   send a signal (SIGTERM by default, 0 only checks)
  path                  print PATH
  pwd                   print the working directory
  resume <pid>          continue a stopped job
  stop <pid>            stop a running job
  touch <file>          create a file or update its modification time
  uptime                time since boot
  whoami                print the current user name

Anything else runs as a program found on PATH. Operators: `<`, `>`, `>>`,
one `|`, and a trailing `&` to run in the background.";

#[derive(FromArgs)]
/// Describe the builtins and operators.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{HELP_TEXT}")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the lines entered in this session.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        for (i, line) in env.history.iter().enumerate() {
            writeln!(stdout, "{:4}  {}", i + 1, line)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create a file, or update its modification time if it exists.
pub struct Touch {
    #[argh(positional)]
    /// file to touch, relative to the current directory.
    pub file: String,
}

impl BuiltinCommand for Touch {
    fn name() -> &'static str {
        "touch"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let path = env.current_dir.join(&self.file);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot touch {}", path.display()))?;
        file.set_modified(SystemTime::now())
            .with_context(|| format!("cannot set time on {}", path.display()))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Define or display aliases.
/// Without arguments every alias is listed; `alias name` shows one,
/// `alias name=value` defines one.
pub struct Alias {
    #[argh(positional, greedy)]
    /// a name, or name=value.
    pub args: Vec<String>,
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.args.is_empty() {
            for alias in env.aliases.iter() {
                writeln!(stdout, "alias {}='{}'", alias.name, alias.value)?;
            }
            return Ok(0);
        }

        // `alias ll='ls -l'` reaches us split on whitespace.
        let definition = self.args.join(" ");
        match definition.split_once('=') {
            Some((name, value)) => {
                env.aliases.add(name, alias::unquote(value));
            }
            None => match env.aliases.lookup(&definition) {
                Some(value) => writeln!(stdout, "alias {definition}='{value}'")?,
                None => writeln!(stdout, "alias: {definition}: not found")?,
            },
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List background jobs.
pub struct Jobs {
    #[argh(switch, short = 'c')]
    /// forget jobs that have finished after listing them.
    pub clean: bool,
}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.jobs.poll();
        for job in env.jobs.iter() {
            writeln!(stdout, "{job}")?;
        }
        if self.clean {
            env.jobs.evict_done();
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Stop a background job with SIGSTOP.
pub struct Stop {
    #[argh(positional)]
    /// process id of the job.
    pub pid: u32,
}

impl BuiltinCommand for Stop {
    fn name() -> &'static str {
        "stop"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.jobs.stop(self.pid)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Continue a stopped job with SIGCONT.
pub struct Resume {
    #[argh(positional)]
    /// process id of the job.
    pub pid: u32,
}

impl BuiltinCommand for Resume {
    fn name() -> &'static str {
        "resume"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.jobs.resume(self.pid)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Bring a background job to the foreground and wait for it to finish.
pub struct Fg {
    #[argh(positional)]
    /// process id of the job.
    pub pid: u32,
}

impl BuiltinCommand for Fg {
    fn name() -> &'static str {
        "fg"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let code = env.jobs.foreground(self.pid)?;
        if let Some(job) = env.jobs.get(self.pid) {
            writeln!(stdout, "{job} ({code})")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Send a signal to a process.
pub struct Kill {
    #[argh(positional)]
    /// process id to signal.
    pub pid: u32,

    #[argh(positional)]
    /// signal number; SIGTERM when omitted.
    pub signal: Option<i32>,
}

impl BuiltinCommand for Kill {
    fn name() -> &'static str {
        "kill"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        // signal 0 delivers nothing and only checks that the process exists
        let signal = match self.signal {
            Some(0) => None,
            Some(number) => Some(
                Signal::try_from(number).map_err(|_| anyhow!("{number}: invalid signal"))?,
            ),
            None => Some(Signal::SIGTERM),
        };
        env.jobs.signal(self.pid, signal)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the search path used to find programs.
pub struct ShowPath {}

impl BuiltinCommand for ShowPath {
    fn name() -> &'static str {
        "path"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let path = env.get_var("PATH").ok_or_else(|| anyhow!("PATH is not set"))?;
        writeln!(stdout, "PATH={path}")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Append a directory to the search path.
pub struct AddPath {
    #[argh(positional)]
    /// directory searched after the existing PATH entries.
    pub dir: String,
}

impl BuiltinCommand for AddPath {
    fn name() -> &'static str {
        "addpath"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let path = match env.get_var("PATH") {
            Some(old) if !old.is_empty() => format!("{old}:{}", self.dir),
            _ => self.dir,
        };
        writeln!(stdout, "PATH updated: {path}")?;
        env.set_var("PATH", path);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the name of the user running the shell.
pub struct Whoami {}

impl BuiltinCommand for Whoami {
    fn name() -> &'static str {
        "whoami"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let uid = getuid();
        let user = User::from_uid(uid)
            .context("cannot read the user database")?
            .ok_or_else(|| anyhow!("no user with uid {uid}"))?;
        writeln!(stdout, "{}", user.name)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print how long the system has been running.
pub struct Uptime {}

impl BuiltinCommand for Uptime {
    fn name() -> &'static str {
        "uptime"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let raw = fs::read_to_string("/proc/uptime").context("cannot read /proc/uptime")?;
        let seconds = parse_uptime(&raw).ok_or_else(|| anyhow!("malformed /proc/uptime"))?;
        writeln!(stdout, "{}", format_uptime(seconds))?;
        Ok(0)
    }
}

/// First field of /proc/uptime, in whole seconds.
fn parse_uptime(raw: &str) -> Option<u64> {
    let seconds: f64 = raw.split_whitespace().next()?.parse().ok()?;
    (seconds >= 0.0).then(|| seconds as u64)
}

fn format_uptime(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    format!("Uptime: {h}h {m}m {s}s")
}

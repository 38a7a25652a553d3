//! Launching a single external program.
//!
//! A child is described declaratively: resolved program, verbatim argv, the
//! shell's variables and working directory, and stdin/stdout bound according to
//! a [`RedirectionPlan`]. Files are opened before the child exists, so a bad
//! redirection or an unknown program is reported without forking.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::find_program;
use crate::redirect::RedirectionPlan;
use log::{debug, info};
use std::ffi::OsStr;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus};

/// What happened to a launched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchResult {
    /// Foreground command finished with this status.
    Exited(ExitCode),
    /// Commands left running in the background, by pid.
    Background(Vec<u32>),
}

/// Run `argv` with the streams described by `plan`.
///
/// In the foreground this blocks until the child terminates. In the background
/// the child is added to the environment's job table and its pid returned.
pub fn launch(
    argv: Vec<String>,
    plan: &RedirectionPlan,
    background: bool,
    env: &mut Environment,
) -> Result<LaunchResult, ShellError> {
    let mut cmd = command_for(&argv, env)?;
    if let Some(file) = plan.open_input()? {
        cmd.stdin(file);
    }
    if let Some(file) = plan.open_output()? {
        cmd.stdout(file);
    }
    let child = spawn(&mut cmd, &argv[0])?;

    if background {
        let pid = env.jobs.insert(child, argv[0].as_str());
        Ok(LaunchResult::Background(vec![pid]))
    } else {
        wait(child).map(LaunchResult::Exited)
    }
}

/// Build the process description for `argv` without spawning it.
pub(crate) fn command_for(argv: &[String], env: &Environment) -> Result<Command, ShellError> {
    let Some(program) = argv.first() else {
        return Err(ShellError::MissingCommand);
    };
    let search_paths = env.get_var("PATH");
    let path = find_program(search_paths.as_deref().map(OsStr::new), &env.current_dir, program)
        .ok_or_else(|| ShellError::ExecResolutionFailed {
            program: program.clone(),
        })?;
    debug!("resolved {program} to {}", path.display());

    let mut cmd = Command::new(path);
    cmd.arg0(program)
        .args(&argv[1..])
        .env_clear()
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir);
    Ok(cmd)
}

pub(crate) fn spawn(cmd: &mut Command, program: &str) -> Result<Child, ShellError> {
    let child = cmd.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ShellError::ExecResolutionFailed {
            program: program.to_string(),
        },
        _ => ShellError::SpawnFailed {
            program: program.to_string(),
            source,
        },
    })?;
    info!("spawned {program} as {}", child.id());
    Ok(child)
}

pub(crate) fn wait(mut child: Child) -> Result<ExitCode, ShellError> {
    let pid = child.id();
    let status = child
        .wait()
        .map_err(|source| ShellError::WaitFailed { pid, source })?;
    let code = exit_code(status);
    debug!("{pid} exited with {code}");
    Ok(code)
}

/// Shell status for a terminated child: its exit code, or `128 + signal`.
pub fn exit_code(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(code) = exit_status.code() {
        code
    } else if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}

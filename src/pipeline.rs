//! Two-stage pipelines: `left | right`.

use crate::env::Environment;
use crate::error::ShellError;
use crate::launcher::{self, LaunchResult};
use crate::lexer::{Operator, Token};
use crate::redirect;
use log::{debug, warn};
use std::process::{Child, Stdio};

fn is_pipe(token: &Token) -> bool {
    *token == Token::Operator(Operator::Pipe)
}

/// Run a token sequence containing at most one `|`.
///
/// Without a pipe the whole sequence is one command. With a pipe, the left
/// stage's stdout feeds the right stage's stdin through a single channel. An
/// explicit file redirection on a stage takes precedence over the channel on
/// that side. In the foreground both stages are waited for, left first, and the
/// right stage's status is returned. In the background both are registered as
/// jobs.
pub fn run_pipeline(
    tokens: Vec<Token>,
    background: bool,
    env: &mut Environment,
) -> Result<LaunchResult, ShellError> {
    let pipes = tokens.iter().filter(|t| is_pipe(t)).count();
    let Some(split) = tokens.iter().position(is_pipe) else {
        let (argv, plan) = redirect::plan(tokens)?;
        return launcher::launch(argv, &plan, background, env);
    };
    if pipes > 1 {
        return Err(ShellError::UnsupportedPipeline { pipes });
    }

    let mut left = tokens;
    let right = left.split_off(split + 1);
    left.pop();

    let (argv_a, plan_a) = redirect::plan(left)?;
    let (argv_b, plan_b) = redirect::plan(right)?;
    if argv_a.is_empty() || argv_b.is_empty() {
        return Err(ShellError::EmptyPipelineStage);
    }
    debug!("pipeline {argv_a:?} | {argv_b:?}");

    // Resolve both programs before anything is spawned.
    let mut cmd_a = launcher::command_for(&argv_a, env)?;
    let mut cmd_b = launcher::command_for(&argv_b, env)?;

    if let Some(file) = plan_a.open_input()? {
        cmd_a.stdin(file);
    }
    match plan_a.open_output()? {
        Some(file) => cmd_a.stdout(file),
        None => cmd_a.stdout(Stdio::piped()),
    };
    let mut child_a = launcher::spawn(&mut cmd_a, &argv_a[0])?;
    let channel = child_a.stdout.take();

    let spawned_b = (|| -> Result<Child, ShellError> {
        match plan_b.open_input()? {
            Some(file) => cmd_b.stdin(file),
            None => cmd_b.stdin(channel.map_or_else(Stdio::null, Stdio::from)),
        };
        if let Some(file) = plan_b.open_output()? {
            cmd_b.stdout(file);
        }
        launcher::spawn(&mut cmd_b, &argv_b[0])
    })();
    // The parent's copy of the read end lives in `cmd_b`; dropping it leaves
    // the channel owned by the two children only.
    drop(cmd_b);

    let child_b = match spawned_b {
        Ok(child) => child,
        Err(e) => {
            finish_orphan(child_a, &argv_a[0], background, env);
            return Err(e);
        }
    };

    if background {
        let pid_a = env.jobs.insert(child_a, argv_a[0].as_str());
        let pid_b = env.jobs.insert(child_b, argv_b[0].as_str());
        return Ok(LaunchResult::Background(vec![pid_a, pid_b]));
    }

    let status_a = launcher::wait(child_a);
    let status_b = launcher::wait(child_b)?;
    if let Err(e) = status_a {
        warn!("{e}");
    }
    Ok(LaunchResult::Exited(status_b))
}

/// The left stage is running but the right one never started.
fn finish_orphan(child: Child, program: &str, background: bool, env: &mut Environment) {
    if background {
        env.jobs.insert(child, program);
    } else if let Err(e) = launcher::wait(child) {
        warn!("{e}");
    }
}

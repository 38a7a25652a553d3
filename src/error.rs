//! Errors raised by the command execution engine.

use crate::command::ExitCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one line's execution.
///
/// None of these end the interpreter loop. Each maps onto the status code the
/// shell records as its last status, see [`ShellError::status`].
#[derive(Debug, Error)]
pub enum ShellError {
    /// A redirection operator without a path after it, e.g. `ls >`.
    #[error("syntax error: missing file name after `{operator}`")]
    MissingOperand { operator: String },

    /// An operator where the grammar does not allow one.
    #[error("syntax error near unexpected token `{operator}`")]
    UnexpectedOperator { operator: String },

    /// Only redirections, no program, e.g. `> out`.
    #[error("syntax error: missing command")]
    MissingCommand,

    /// One side of `|` has no command.
    #[error("syntax error: empty command in pipeline")]
    EmptyPipelineStage,

    /// More than one `|` on a line.
    #[error("pipelines with more than two commands are not supported ({pipes} pipes)")]
    UnsupportedPipeline { pipes: usize },

    #[error("{name}: alias recursion too deep (limit {limit})")]
    AliasRecursionExceeded { name: String, limit: usize },

    #[error("{}: {source}", path.display())]
    RedirectionOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program}: command not found")]
    ExecResolutionFailed { program: String },

    #[error("{program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("wait for {pid} failed: {source}")]
    WaitFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("cannot send {signal} to {pid}: {errno}")]
    SignalDeliveryFailed {
        pid: u32,
        signal: String,
        errno: nix::Error,
    },

    #[error("{pid}: no such job")]
    NoSuchJob { pid: u32 },

    #[error("{value}: invalid process id")]
    InvalidPid { value: String },
}

impl ShellError {
    /// Status the shell records when a line ends with this error.
    pub fn status(&self) -> ExitCode {
        match self {
            ShellError::MissingOperand { .. }
            | ShellError::UnexpectedOperator { .. }
            | ShellError::MissingCommand
            | ShellError::EmptyPipelineStage
            | ShellError::UnsupportedPipeline { .. } => 2,
            ShellError::ExecResolutionFailed { .. } => 127,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_map_to_status_2() {
        let err = ShellError::MissingOperand {
            operator: ">".into(),
        };
        assert_eq!(err.status(), 2);
        assert_eq!(ShellError::UnsupportedPipeline { pipes: 2 }.status(), 2);
    }

    #[test]
    fn unresolved_program_maps_to_127() {
        let err = ShellError::ExecResolutionFailed {
            program: "nope".into(),
        };
        assert_eq!(err.status(), 127);
        assert_eq!(err.to_string(), "nope: command not found");
    }

    #[test]
    fn redirection_failure_names_the_path() {
        let err = ShellError::RedirectionOpenFailed {
            path: PathBuf::from("/no/such/file"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.status(), 1);
        assert!(err.to_string().starts_with("/no/such/file: "));
    }
}

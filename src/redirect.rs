//! Extraction of `<`, `>` and `>>` redirections from a command's tokens.

use crate::error::ShellError;
use crate::lexer::{Operator, Token};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;

/// Destination of a command's standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    /// `>>` appends, `>` truncates.
    pub append: bool,
}

/// Where a command's standard streams come from and go to.
///
/// At most one input and one output are honored; when a line names several,
/// the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionPlan {
    pub input: Option<PathBuf>,
    pub output: Option<OutputTarget>,
}

impl RedirectionPlan {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Open the input file read-only.
    pub fn open_input(&self) -> Result<Option<File>, ShellError> {
        let Some(path) = &self.input else {
            return Ok(None);
        };
        File::open(path)
            .map(Some)
            .map_err(|source| ShellError::RedirectionOpenFailed {
                path: path.clone(),
                source,
            })
    }

    /// Open the output file write-only, creating it and truncating or appending.
    pub fn open_output(&self) -> Result<Option<File>, ShellError> {
        let Some(target) = &self.output else {
            return Ok(None);
        };
        let mut options = OpenOptions::new();
        if target.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        options
            .create(true)
            .open(&target.path)
            .map(Some)
            .map_err(|source| ShellError::RedirectionOpenFailed {
                path: target.path.clone(),
                source,
            })
    }
}

/// Whether any token is a redirection operator.
pub fn has_redirection(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(t, Token::Operator(op) if op.is_redirection()))
}

/// Split a command's tokens into its argument vector and redirection plan.
///
/// Each redirection operator consumes the word after it. An operator with no
/// word after it is rejected rather than passed to the program as an argument.
pub fn plan(tokens: Vec<Token>) -> Result<(Vec<String>, RedirectionPlan), ShellError> {
    let mut argv = Vec::with_capacity(tokens.len());
    let mut plan = RedirectionPlan::default();
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        let op = match token {
            Token::Word(w) => {
                argv.push(w);
                continue;
            }
            Token::Operator(Operator::Pipe) => {
                return Err(ShellError::UnexpectedOperator {
                    operator: Operator::Pipe.as_str().into(),
                });
            }
            Token::Operator(op) => op,
        };
        let path = match tokens.next() {
            Some(Token::Word(w)) => PathBuf::from(w),
            _ => {
                return Err(ShellError::MissingOperand {
                    operator: op.as_str().into(),
                });
            }
        };
        match op {
            Operator::RedirectIn => plan.input = Some(path),
            Operator::RedirectOut => plan.output = Some(OutputTarget { path, append: false }),
            Operator::RedirectAppend => plan.output = Some(OutputTarget { path, append: true }),
            Operator::Pipe => unreachable!(),
        }
    }

    Ok((argv, plan))
}

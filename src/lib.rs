//! A small interactive command interpreter.
//!
//! Lines are split into words and the operators `<`, `>`, `>>` and `|`. A
//! leading alias is expanded (at most ten substitutions deep), a trailing `&`
//! sends the work to the background, and the result runs as a builtin, a single
//! external program with its redirections, or a two-stage pipeline.
//!
//! The main entry point is [`Interpreter`]. The core stages are public as
//! modules too: [`lexer`], [`alias`], [`redirect`], [`launcher`], [`pipeline`]
//! and [`jobs`], each operating on an explicitly passed [`env::Environment`].

pub mod alias;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod jobs;
pub mod launcher;
pub mod lexer;
pub mod logging;
pub mod pipeline;
pub mod redirect;
pub mod registry;
#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::ShellError;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use registry::BuiltinRegistry;

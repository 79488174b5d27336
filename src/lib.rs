//! A small interactive shell.
//!
//! The crate is built around two pieces: the [`lexer`], which turns one
//! raw input line into argument tokens plus redirection directives under
//! shell-like quoting and escaping rules, and the [`Interpreter`], which
//! routes the lexed result to a builtin handler or to an external
//! program found on the search path. Builtins (`exit`, `echo`, `type`,
//! `pwd`, `cd`, `cat`) run in-process; everything else is spawned as a
//! child with its output streams optionally redirected to files.
//!
//! Pipelines, job control, globbing and variable expansion are out of
//! scope.

mod builtin;
mod command;
mod env;
mod external;
mod interpreter;
pub mod lexer;

pub use command::{Command, ExitCode};
pub use env::Environment;
pub use interpreter::Interpreter;

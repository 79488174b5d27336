use crate::lexer::{ParsedLine, RedirectSet};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure,
/// mirroring the convention used by POSIX shells.
pub type ExitCode = i32;

/// One fully-lexed command line: the verb, its arguments, and the
/// redirection directives attached to the line.
///
/// Built once per input line and consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub redirects: RedirectSet,
}

impl Command {
    /// Splits a lexed line into verb and arguments.
    ///
    /// Returns `None` for a line that produced no words (blank input),
    /// which the caller should skip rather than dispatch.
    pub fn from_parsed(parsed: ParsedLine) -> Option<Self> {
        let mut words = parsed.tokens.into_iter();
        let name = words.next()?;
        Some(Command {
            name,
            args: words.collect(),
            redirects: parsed.redirects,
        })
    }
}

//! Lexical analysis of one raw input line into argument tokens and
//! redirection directives.
//!
//! The scan is a small finite state machine: a quote state
//! (`None`/`Single`/`Double`), an escape-pending flag and a token
//! accumulator, advanced one character at a time. Quoting rules follow
//! the usual shell conventions:
//!
//! - single quotes are fully literal inside double quotes and vice versa
//!   (the two modes never nest into each other);
//! - a backslash escapes the next character, except inside single quotes
//!   where it is an ordinary character;
//! - an unquoted `>` (also `1>`, `2>`, `>>`, `1>>`, `2>>`) starts a
//!   redirection directive whose target is the trimmed remainder of the
//!   line, after which the scan stops.

use thiserror::Error;

/// Which output stream a redirection directive applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectStream {
    Stdout,
    Stderr,
}

/// A single redirection directive: route a stream into `target`,
/// truncating the file or appending to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub append: bool,
}

/// Redirection directives collected from one line.
///
/// At most one target per stream; `None` means the stream stays attached
/// to the shell's own stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectSet {
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
}

impl RedirectSet {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }
}

/// The result of lexing one line: shell words in order, plus any
/// redirection directives found along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub tokens: Vec<String>,
    pub redirects: RedirectSet,
}

/// Errors that can occur during lexical analysis.
///
/// Lexing is all-or-nothing per line: on error no partial token list is
/// returned and the caller must discard the line.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    /// End of line was reached inside a single- or double-quoted region.
    #[error("parse error: mismatched quotes")]
    MismatchedQuotes,
    /// A redirection operator with nothing after it.
    #[error("parse error: missing redirection target")]
    MissingRedirectTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    None,
    Single,
    Double,
}

struct LexingFsm {
    input: Vec<char>,
    pos: usize,
    quote: QuoteState,
    escape_pending: bool,
    buffer: String,
    /// True when any character of `buffer` arrived quoted or escaped.
    /// Such a word can never be the fd digit of a redirection operator.
    buffer_quoted: bool,
    out: ParsedLine,
}

impl LexingFsm {
    fn new(line: &str) -> Self {
        LexingFsm {
            input: line.chars().collect(),
            pos: 0,
            quote: QuoteState::None,
            escape_pending: false,
            buffer: String::new(),
            buffer_quoted: false,
            out: ParsedLine::default(),
        }
    }

    fn run(mut self) -> Result<ParsedLine, LexError> {
        while let Some(ch) = self.read_char() {
            // An escaped character never toggles state or separates tokens.
            if self.escape_pending {
                self.buffer.push(ch);
                self.buffer_quoted = true;
                self.escape_pending = false;
                continue;
            }
            match self.quote {
                QuoteState::Single => self.scan_single_quoted(ch),
                QuoteState::Double => self.scan_double_quoted(ch),
                QuoteState::None => {
                    let stop = self.scan_unquoted(ch)?;
                    if stop {
                        return Ok(self.out);
                    }
                }
            }
        }

        if self.quote != QuoteState::None {
            return Err(LexError::MismatchedQuotes);
        }
        // A trailing backslash has nothing to escape and is dropped.
        self.flush_token();
        Ok(self.out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    /// Inside single quotes every character is literal, including
    /// backslash, until the closing quote.
    fn scan_single_quoted(&mut self, ch: char) {
        match ch {
            '\'' => self.quote = QuoteState::None,
            c => {
                self.buffer.push(c);
                self.buffer_quoted = true;
            }
        }
    }

    fn scan_double_quoted(&mut self, ch: char) {
        match ch {
            '"' => self.quote = QuoteState::None,
            '\\' => self.escape_pending = true,
            c => {
                self.buffer.push(c);
                self.buffer_quoted = true;
            }
        }
    }

    /// Returns `true` when the scan is complete because a redirection
    /// target consumed the rest of the line.
    fn scan_unquoted(&mut self, ch: char) -> Result<bool, LexError> {
        match ch {
            ' ' => self.flush_token(),
            '\'' => self.quote = QuoteState::Single,
            '"' => self.quote = QuoteState::Double,
            '\\' => self.escape_pending = true,
            '>' => {
                self.take_redirect()?;
                return Ok(true);
            }
            c => self.buffer.push(c),
        }
        Ok(false)
    }

    /// Consumes a redirection directive starting at the `>` just read.
    ///
    /// An accumulator holding exactly `1` or `2`, written plain, is the
    /// file descriptor digit of the operator and is swallowed; a quoted
    /// or escaped digit is an ordinary word, as is anything else, and the
    /// stream defaults to stdout. A second `>` selects append mode. The
    /// trimmed remainder of the line is the target and the scan
    /// terminates on it.
    fn take_redirect(&mut self) -> Result<(), LexError> {
        let fd_digit = if self.buffer_quoted {
            None
        } else {
            match self.buffer.as_str() {
                "1" => Some(RedirectStream::Stdout),
                "2" => Some(RedirectStream::Stderr),
                _ => None,
            }
        };
        let stream = match fd_digit {
            Some(stream) => {
                self.buffer.clear();
                stream
            }
            None => {
                self.flush_token();
                RedirectStream::Stdout
            }
        };

        let append = self.peek_char() == Some('>');
        if append {
            self.read_char();
        }

        let target: String = self.input[self.pos..].iter().collect();
        let target = target.trim();
        self.pos = self.input.len();
        if target.is_empty() {
            return Err(LexError::MissingRedirectTarget);
        }

        let redirect = Redirect {
            target: target.to_string(),
            append,
        };
        match stream {
            RedirectStream::Stdout => self.out.redirects.stdout = Some(redirect),
            RedirectStream::Stderr => self.out.redirects.stderr = Some(redirect),
        }
        Ok(())
    }

    fn flush_token(&mut self) {
        if !self.buffer.is_empty() {
            self.out.tokens.push(std::mem::take(&mut self.buffer));
        }
        self.buffer_quoted = false;
    }
}

/// Lexes one raw input line.
///
/// Returns the shell words in order together with any redirection
/// directives, or a [`LexError`] for a line that cannot be tokenized.
pub fn split_into_tokens(line: &str) -> Result<ParsedLine, LexError> {
    LexingFsm::new(line).run()
}

/// Renders one token so that lexing it again yields the identical token.
///
/// Words made of plain characters pass through untouched; everything else
/// is wrapped in single quotes, with embedded single quotes emitted as
/// `'\''` (close the quote, escape one quote character, reopen).
pub fn quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '='))
    {
        return word.to_string();
    }
    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('\'');
    for c in word.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

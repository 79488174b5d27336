use crate::builtin::{Builtin, run_builtin};
use crate::command::{Command, ExitCode};
use crate::env::Environment;
use crate::external::ExternalCommand;
use crate::lexer;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// The interactive shell: a read-lex-dispatch loop over one
/// [`Environment`].
///
/// Each line is lexed into a [`Command`] and routed either to a builtin
/// handler or to an external program found on the search path. All
/// diagnostics — lex errors, unknown commands, builtin failures — are
/// printed to standard output, matching the modeled behavior.
///
/// Example
/// ```
/// use minishell::{Command, Interpreter, lexer};
/// let mut sh = Interpreter::default();
/// let parsed = lexer::split_into_tokens("echo hello world").unwrap();
/// let cmd = Command::from_parsed(parsed).unwrap();
/// let code = sh.dispatch(cmd).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    pub fn new(env: Environment) -> Self {
        Interpreter { env }
    }

    /// Routes one command to the matching handler and returns its exit
    /// code, writing to the process's standard output.
    pub fn dispatch(&mut self, cmd: Command) -> anyhow::Result<ExitCode> {
        self.dispatch_to(cmd, &mut std::io::stdout())
    }

    /// Dispatch with an explicit output stream for builtin output and
    /// diagnostics. External children still inherit the process streams
    /// (subject to their redirection directives).
    pub fn dispatch_to(&mut self, cmd: Command, stdout: &mut dyn Write) -> anyhow::Result<ExitCode> {
        match Builtin::lookup(&cmd.name) {
            Some(kind) => run_builtin(kind, &cmd.args, stdout, &mut self.env),
            None => match ExternalCommand::prepare(&self.env, &cmd) {
                Some(external) => match external.execute(&self.env) {
                    Ok(code) => Ok(code),
                    Err(e) => {
                        writeln!(stdout, "{e}")?;
                        Ok(1)
                    }
                },
                None => {
                    writeln!(stdout, "{}: command not found", cmd.name)?;
                    Ok(127)
                }
            },
        }
    }

    /// The read-eval loop.
    ///
    /// Runs until `exit 0` sets the termination flag or standard input is
    /// closed (Ctrl-D), which ends the session cleanly. Ctrl-C abandons
    /// the current line and re-prompts. Lex errors discard the line with
    /// a diagnostic; no error here is fatal to the shell.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            let outcome = rl.readline("$ ");
            if let Ok(line) = &outcome {
                rl.add_history_entry(line.as_str())?;
            }
            match self.handle_readline(outcome, &mut std::io::stdout()) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Stop) => break,
                Err(e) => println!("{e}"),
            }
        }

        Ok(())
    }

    /// Decides what one readline outcome does to the session.
    ///
    /// A read line is lexed and dispatched (diagnostics to `stdout`);
    /// Ctrl-C abandons the line; end of input stops the loop cleanly; any
    /// other read error is reported and stops the loop.
    fn handle_readline(
        &mut self,
        outcome: rustyline::Result<String>,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<LoopControl> {
        match outcome {
            Ok(line) => {
                let parsed = match lexer::split_into_tokens(&line) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        writeln!(stdout, "{e}")?;
                        return Ok(LoopControl::Continue);
                    }
                };
                if let Some(cmd) = Command::from_parsed(parsed) {
                    if let Err(e) = self.dispatch_to(cmd, stdout) {
                        writeln!(stdout, "{e}")?;
                    }
                }
                Ok(LoopControl::Continue)
            }
            Err(ReadlineError::Interrupted) => Ok(LoopControl::Continue),
            Err(ReadlineError::Eof) => Ok(LoopControl::Stop),
            Err(err) => {
                writeln!(stdout, "Error: {err:?}")?;
                Ok(LoopControl::Stop)
            }
        }
    }
}

/// Whether the read-eval loop keeps going after one readline outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Stop,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(Environment::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn dispatch_line(sh: &mut Interpreter, line: &str) -> (ExitCode, String) {
        let parsed = lexer::split_into_tokens(line).expect("line should lex");
        let cmd = Command::from_parsed(parsed).expect("line should have a verb");
        let mut out = Vec::new();
        let code = sh.dispatch_to(cmd, &mut out).expect("dispatch should not fail");
        (code, String::from_utf8(out).expect("utf8 output"))
    }

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("minishell_{}_{}_{}", tag, std::process::id(), nanos));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn builtin_echo_goes_through_the_lexer() {
        let mut sh = Interpreter::default();
        let (code, out) = dispatch_line(&mut sh, "echo 'a b' c");
        assert_eq!(code, 0);
        assert_eq!(out, "a b c\n");
    }

    #[test]
    fn unknown_verb_reports_command_not_found() {
        let mut env = Environment::new();
        env.set_var("PATH", std::env::temp_dir().display().to_string());
        let mut sh = Interpreter::new(env);
        let (code, out) = dispatch_line(&mut sh, "definitely_not_a_command_xyz");
        assert_eq!(code, 127);
        assert_eq!(out, "definitely_not_a_command_xyz: command not found\n");
    }

    #[test]
    fn unknown_verb_with_empty_search_path() {
        let mut env = Environment::new();
        env.set_var("PATH", "");
        let mut sh = Interpreter::new(env);
        let (code, out) = dispatch_line(&mut sh, "ls");
        assert_eq!(code, 127);
        assert_eq!(out, "ls: command not found\n");
    }

    #[test]
    fn type_of_builtin_through_dispatch() {
        let mut sh = Interpreter::default();
        let (_, out) = dispatch_line(&mut sh, "type cd");
        assert_eq!(out, "cd is a shell builtin\n");
    }

    #[test]
    fn exit_zero_terminates_only_in_exact_form() {
        let mut sh = Interpreter::default();
        dispatch_line(&mut sh, "exit 1");
        assert!(!sh.env.should_exit);
        dispatch_line(&mut sh, "exit 0 now");
        assert!(!sh.env.should_exit);
        dispatch_line(&mut sh, "exit 0");
        assert!(sh.env.should_exit);
    }

    #[test]
    fn exit_zero_spellings_that_lex_alike_also_terminate() {
        for line in ["exit   0", "exit \"0\""] {
            let mut sh = Interpreter::default();
            dispatch_line(&mut sh, line);
            assert!(sh.env.should_exit, "{line:?} should terminate");
        }
    }

    #[test]
    fn lex_error_produces_no_command() {
        assert!(lexer::split_into_tokens("echo 'unterminated").is_err());
    }

    fn feed(sh: &mut Interpreter, outcome: rustyline::Result<String>) -> (LoopControl, String) {
        let mut out = Vec::new();
        let control = sh
            .handle_readline(outcome, &mut out)
            .expect("handling should not fail");
        (control, String::from_utf8(out).expect("utf8 output"))
    }

    #[test]
    fn end_of_input_stops_the_loop_cleanly() {
        let mut sh = Interpreter::default();
        let (control, out) = feed(&mut sh, Err(ReadlineError::Eof));
        assert_eq!(control, LoopControl::Stop);
        assert!(out.is_empty(), "closed stdin must not print a diagnostic");
    }

    #[test]
    fn interrupt_abandons_the_line_and_keeps_going() {
        let mut sh = Interpreter::default();
        let (control, out) = feed(&mut sh, Err(ReadlineError::Interrupted));
        assert_eq!(control, LoopControl::Continue);
        assert!(out.is_empty());
    }

    #[test]
    fn lex_error_discards_the_line_and_keeps_going() {
        let mut sh = Interpreter::default();
        let (control, out) = feed(&mut sh, Ok("echo 'unterminated".to_string()));
        assert_eq!(control, LoopControl::Continue);
        assert_eq!(out, "parse error: mismatched quotes\n");
    }

    #[test]
    fn blank_line_is_a_quiet_no_op() {
        let mut sh = Interpreter::default();
        let (control, out) = feed(&mut sh, Ok("   ".to_string()));
        assert_eq!(control, LoopControl::Continue);
        assert!(out.is_empty());
    }

    #[test]
    fn read_lines_are_dispatched() {
        let mut sh = Interpreter::default();
        let (control, out) = feed(&mut sh, Ok("echo hello".to_string()));
        assert_eq!(control, LoopControl::Continue);
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn exit_zero_line_sets_the_termination_flag() {
        let mut sh = Interpreter::default();
        let (control, _) = feed(&mut sh, Ok("exit 0".to_string()));
        // The flag, not the loop decision, carries the shutdown; the
        // loop condition observes it before the next read.
        assert_eq!(control, LoopControl::Continue);
        assert!(sh.env.should_exit);
    }

    #[test]
    #[cfg(unix)]
    fn external_command_runs_with_redirect() {
        let dir = make_unique_temp_dir("dispatch_redir");
        let out_file = dir.join("out.txt");

        let mut sh = Interpreter::default();
        let (code, out) = dispatch_line(&mut sh, &format!("ls / > {}", out_file.display()));
        assert_eq!(code, 0);
        assert!(out.is_empty(), "diagnostic output was not expected: {out}");
        assert!(!fs::read_to_string(&out_file).unwrap().is_empty());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn redirect_open_failure_skips_the_command() {
        let mut sh = Interpreter::default();
        let (code, out) = dispatch_line(&mut sh, "echo hi > /nonexistent-dir/out.txt");
        assert_eq!(code, 1);
        assert!(out.contains("failed to open file for redirection"), "got: {out}");
    }

    #[test]
    fn builtins_ignore_redirection_directives() {
        let dir = make_unique_temp_dir("builtin_redir");
        let out_file = dir.join("out.txt");

        let mut sh = Interpreter::default();
        let (_, out) = dispatch_line(&mut sh, &format!("echo hi > {}", out_file.display()));
        // The modeled behavior: builtin output stays on the shell's own
        // stream and the target file is never created.
        assert_eq!(out, "hi\n");
        assert!(!out_file.exists());

        let _ = fs::remove_dir_all(dir);
    }
}

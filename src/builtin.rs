use crate::command::ExitCode;
use crate::env::Environment;
use crate::external::find_command_path;
use anyhow::{Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use std::env as stdenv;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Verbs implemented directly by the shell rather than by spawning a
/// child process.
///
/// A closed enum so that dispatch is an exhaustive match instead of a
/// runtime string-keyed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Type,
    Pwd,
    Cd,
    Cat,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "exit" => Some(Builtin::Exit),
            "echo" => Some(Builtin::Echo),
            "type" => Some(Builtin::Type),
            "pwd" => Some(Builtin::Pwd),
            "cd" => Some(Builtin::Cd),
            "cat" => Some(Builtin::Cat),
            _ => None,
        }
    }
}

/// Common shape of a builtin body.
///
/// Each builtin declares its arguments as an [`argh`] `FromArgs` struct
/// and executes in-process against the provided output stream and
/// environment. Return value follows shell conventions: 0 for success,
/// non-zero for error.
trait BuiltinCommand: Sized + FromArgs {
    fn name() -> &'static str;

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Routes one builtin invocation to its handler.
///
/// Argument parse failures and handler errors are printed to `stdout`
/// (this shell reports everything on standard output) and become exit
/// code 1; they never abort the shell itself.
pub(crate) fn run_builtin(
    kind: Builtin,
    args: &[String],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    match kind {
        Builtin::Exit => run_parsed::<Exit>(args, stdout, env),
        Builtin::Echo => run_parsed::<Echo>(args, stdout, env),
        Builtin::Type => run_parsed::<Type>(args, stdout, env),
        Builtin::Pwd => run_parsed::<Pwd>(args, stdout, env),
        Builtin::Cd => run_parsed::<Cd>(args, stdout, env),
        Builtin::Cat => run_parsed::<Cat>(args, stdout, env),
    }
}

fn run_parsed<T: BuiltinCommand>(
    args: &[String],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::name()], &argv) {
        Ok(cmd) => match cmd.execute(stdout, env) {
            Ok(code) => Ok(code),
            Err(e) => {
                writeln!(stdout, "{e}")?;
                Ok(1)
            }
        },
        Err(EarlyExit { output, status }) => {
            writeln!(stdout, "{}", output.trim_end())?;
            Ok(if status.is_err() { 1 } else { 0 })
        }
    }
}

#[derive(FromArgs)]
/// Terminate the shell session. Only the form `exit 0` actually ends it.
/// The check runs on the lexed argv, so spellings that tokenize the same
/// way (`exit  0`, `exit "0"`) terminate too; any other argument list is
/// ignored.
struct Exit {
    #[argh(positional, greedy)]
    /// exit status; anything but a lone `0` is ignored.
    args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        // Any other argument list is a silent no-op.
        if self.args == ["0"] {
            env.should_exit = true;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by spaces,
/// followed by a newline.
struct Echo {
    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how a command name would be interpreted.
struct Type {
    #[argh(positional)]
    /// command name to look up.
    name: String,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if Builtin::lookup(&self.name).is_some() {
            writeln!(stdout, "{} is a shell builtin", self.name)?;
            return Ok(0);
        }
        let search_paths = env.search_path().unwrap_or_default();
        match find_command_path(OsStr::new(&search_paths), Path::new(&self.name)) {
            Some(path) => {
                writeln!(stdout, "{} is {}", self.name, path.display())?;
                Ok(0)
            }
            None => {
                writeln!(stdout, "{}: not found", self.name)?;
                Ok(1)
            }
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory.
struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory. With no target, or with `~`,
/// changes to the home directory.
struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current one.
    target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let typed = self.target.as_deref().unwrap_or("~");
        let target = match typed {
            "~" => env
                .home_dir()
                .ok_or_else(|| anyhow!("cd: could not determine home directory"))?,
            other => PathBuf::from(other),
        };

        let candidate = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let resolved = fs::canonicalize(&candidate)
            .map_err(|_| anyhow!("cd: {}: No such file or directory", typed))?;
        stdenv::set_current_dir(&resolved)
            .map_err(|_| anyhow!("cd: {}: No such file or directory", typed))?;
        env.current_dir = resolved;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Concatenate the named files to standard output.
struct Cat {
    #[argh(positional, greedy)]
    /// files to concatenate, in order.
    files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if self.files.is_empty() {
            bail!("cat: missing file operand");
        }
        // Everything is read before anything is printed, so a failure on
        // any operand produces no partial output.
        let mut contents = Vec::new();
        for name in &self.files {
            let path = env.current_dir.join(name);
            let bytes =
                fs::read(&path).map_err(|e| anyhow!("cat: cannot open '{}': {}", name, e))?;
            contents.extend_from_slice(&bytes);
        }
        stdout.write_all(&contents)?;
        Ok(0)
    }
}

use crate::command::{Command, ExitCode};
use crate::env::Environment;
use crate::lexer::{Redirect, RedirectSet};
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// A verb that resolved to an executable on disk, ready to spawn.
pub(crate) struct ExternalCommand {
    path: PathBuf,
    args: Vec<String>,
    redirects: RedirectSet,
}

impl ExternalCommand {
    /// Resolves `cmd.name` against the environment's search path.
    ///
    /// Returns `None` when no executable matches, which the dispatcher
    /// reports as "command not found".
    pub(crate) fn prepare(env: &Environment, cmd: &Command) -> Option<Self> {
        let search_paths = env.search_path()?;
        let path = find_command_path(OsStr::new(&search_paths), Path::new(&cmd.name))?;
        Some(ExternalCommand {
            path: path.into_owned(),
            args: cmd.args.clone(),
            redirects: cmd.redirects.clone(),
        })
    }

    /// Spawns the child and blocks until it finishes.
    ///
    /// Redirect targets are opened before the spawn; an open failure
    /// aborts the execution and the child never starts. Handles are
    /// dropped on every exit path once the child has been started or the
    /// attempt has failed.
    pub(crate) fn execute(self, env: &Environment) -> Result<ExitCode> {
        let mut child = std::process::Command::new(&self.path);
        child
            .args(&self.args)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir);

        if let Some(redirect) = &self.redirects.stdout {
            child.stdout(Stdio::from(open_redirect_target(redirect)?));
        }
        if let Some(redirect) = &self.redirects.stderr {
            child.stderr(Stdio::from(open_redirect_target(redirect)?));
        }

        let status = child
            .status()
            .with_context(|| format!("failed to execute {}", self.path.display()))?;
        match status.code() {
            Some(code) => Ok(code),
            None => Ok(terminated_by_signal(status)),
        }
    }
}

fn open_redirect_target(redirect: &Redirect) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(!redirect.append)
        .append(redirect.append)
        .open(&redirect.target)
        .with_context(|| format!("failed to open file for redirection: {}", redirect.target))
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    match ExitStatusExt::signal(&exit_status) {
        Some(signal) => 128 + signal,
        None => -1,
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// - Absolute path: returned if it names an existing non-directory.
/// - `./`-prefixed or multi-component relative path (e.g. `bin/sh`):
///   returned if it exists in the current directory.
/// - Single bare component: each directory of `search_paths` is joined
///   with the name and the first existing non-directory match wins.
/// - Empty path: not found.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return executable_at(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir {
        if let Some(found) = executable_at(path) {
            return Some(Cow::Borrowed(found));
        }
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(name), None) => find_in_path(search_paths, name.as_os_str()).map(Cow::Owned),
        _ => executable_at(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let candidate = dir.join(cmd);
        if executable_at(&candidate).is_some() {
            return Some(candidate);
        }
    }
    None
}

/// A candidate resolves only when it exists and is not a directory.
fn executable_at(path: &Path) -> Option<&Path> {
    if path.exists() && !path.is_dir() {
        Some(path)
    } else {
        None
    }
}

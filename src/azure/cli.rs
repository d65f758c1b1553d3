//! Azure CLI command execution.
//!
//! Runs `az` commands, returns their stdout and classifies failures so callers
//! can tell an expired login from a missing resource.

use crate::config::MAX_CLI_OUTPUT;
use crate::error::{CloudErrorKind, FwError, Result};
use colored::Colorize;
use itertools::Itertools;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::process::Command;
use std::sync::OnceLock;

/// Regex for splitting command strings while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();
static AUTH_REGEX: OnceLock<Regex> = OnceLock::new();
static PERMISSION_REGEX: OnceLock<Regex> = OnceLock::new();
static NOT_FOUND_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|\"([^\"]*)\"\s*|([^'\s]*)\s*"#).expect("Invalid Regex")
    })
}

fn get_auth_regex() -> &'static Regex {
    AUTH_REGEX.get_or_init(|| {
        Regex::new(r"(?i)az login|AADSTS\d+|InvalidAuthenticationToken|ExpiredAuthenticationToken|refresh token .*expired|not logged in")
            .expect("Invalid Regex")
    })
}

fn get_permission_regex() -> &'static Regex {
    PERMISSION_REGEX.get_or_init(|| {
        Regex::new(r"(?i)AuthorizationFailed|does not have authorization|Forbidden|LinkedAuthorizationFailed")
            .expect("Invalid Regex")
    })
}

fn get_not_found_regex() -> &'static Regex {
    NOT_FOUND_REGEX.get_or_init(|| {
        Regex::new(r"(?i)ResourceNotFound|ResourceGroupNotFound|NotFound|was not found|could not be found")
            .expect("Invalid Regex")
    })
}

/// Classify `az` stderr into a [`CloudErrorKind`].
pub fn classify_stderr(stderr: &str) -> CloudErrorKind {
    if get_auth_regex().is_match(stderr) {
        CloudErrorKind::Auth
    } else if get_permission_regex().is_match(stderr) {
        CloudErrorKind::Permission
    } else if get_not_found_regex().is_match(stderr) {
        CloudErrorKind::NotFound
    } else {
        CloudErrorKind::Transient
    }
}

/// Run a shell command and return its stdout.
///
/// The command string is split on spaces, with quoted substrings preserved.
pub fn run(cmd: &str) -> Result<String> {
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let cmds: Vec<&str> = split_and_strip(cmd);
    log::trace!("split cmds={:?}", cmds);
    run_args(&cmds)
}

/// Run a program with an argument vector and return its stdout.
///
/// Arguments reach the program unchanged. A command that cannot be started at
/// all is reported as [`CloudErrorKind::Auth`] since no session can exist
/// without a working `az`.
pub fn run_args<S: AsRef<str>>(cmds: &[S]) -> Result<String> {
    let cmd = cmds.iter().map(|c| c.as_ref()).join(" ");
    let program = cmds.first().map(|c| c.as_ref()).unwrap_or_default();
    if program.is_empty() {
        return Err(FwError::Cli {
            kind: CloudErrorKind::Transient,
            message: "empty command".to_string(),
        });
    }

    // Build command and add args
    let mut command = Command::new(program);
    for arg in cmds.iter().skip(1) {
        command.arg(arg.as_ref());
    }

    let output = command.output().map_err(|e| {
        log::error!("Command execution failed: {}", e);
        FwError::Cli {
            kind: CloudErrorKind::Auth,
            message: format!("Failed to execute {program}: {e}"),
        }
    })?;

    if output.status.success() {
        log::debug!("Success cmd: {cmd}");
        log::debug!("Success output.stdout.len(): {}", output.stdout.len());

        if output.stdout.len() > MAX_CLI_OUTPUT {
            return Err(FwError::Cli {
                kind: CloudErrorKind::Transient,
                message: format!(
                    "Response too large: {} bytes for command: {cmd}",
                    output.stdout.len(),
                ),
            });
        }
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::trace!(
            "code={code:?}, status={status}\n┎######\nstderr=\n{stderr}\n┖######",
            code = output.status.code(),
            status = output.status,
            stderr = stderr.red()
        );
        log::warn!(
            "{failed} to run {cmd}",
            failed = "failed".on_red(),
            cmd = cmd.on_blue()
        );
        return Err(FwError::Cli {
            kind: classify_stderr(&stderr),
            message: stderr.trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| FwError::Cli {
        kind: CloudErrorKind::Transient,
        message: format!("Invalid UTF-8: {e}"),
    })
}

/// Parse JSON, reporting the failing path on a shape mismatch.
pub fn parse_json<T: DeserializeOwned>(output: &str, context: &str) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{}\n\nOUTPUT END\n", output);
        FwError::Parse {
            context: context.to_string(),
            path: e.path().to_string(),
            message: e.inner().to_string(),
        }
    })
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .collect()
}

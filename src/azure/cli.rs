//! Azure CLI command execution.
//!
//! Used by the CLI token source to run `az account get-access-token`.

use crate::error::{Error, Result};
use colored::Colorize;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::process::Command;
use std::sync::OnceLock;

/// Regex for splitting command strings while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

const MAX_OUTPUT_BYTES: usize = 500_000;

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|\"([^\"]*)\"\s*|([^'\s]*)\s*"#).expect("Invalid Regex")
    })
}

/// Run a command line and return its stdout.
///
/// The command string is split on spaces, with quoted substrings preserved.
pub fn run(cmd: &str) -> Result<String> {
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let cmds: Vec<&str> = split_and_strip(cmd)
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect();
    log::trace!("split cmds={:?}", cmds);
    let Some((program, args)) = cmds.split_first() else {
        return Err(Error::Cli("empty command".to_string()));
    };

    let output = Command::new(program).args(args).output().map_err(|e| {
        log::error!("Command execution failed: {}", e);
        Error::Cli(format!("Failed to execute {program:?}: {e}"))
    })?;

    if !output.status.success() {
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
        return Err(Error::Cli(format!("ERROR running: {}", stderr.trim())));
    }

    log::debug!("Success cmd: {cmd} stdout.len()={}", output.stdout.len());
    if output.stdout.len() > MAX_OUTPUT_BYTES {
        return Err(Error::Cli(format!(
            "Response too large: {} bytes for command: {:?}",
            output.stdout.len(),
            cmds
        )));
    }

    String::from_utf8(output.stdout).map_err(|e| Error::Cli(format!("Invalid UTF-8: {e}")))
}

/// Run a command that prints JSON and decode it.
pub fn run_json<T: DeserializeOwned>(cmd: &str) -> Result<T> {
    let output = run(cmd)?;
    let mut deserializer = serde_json::Deserializer::from_str(&output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{}\n\nOUTPUT END\n", output);
        Error::from(e)
    })
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .collect()
}

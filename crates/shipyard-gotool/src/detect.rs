//! Go toolchain detection.

use std::path::{Path, PathBuf};
use std::process::Command;

use shipyard_util::process::run_command;

use crate::error::GotoolError;

/// A usable Go toolchain installation.
#[derive(Debug, Clone)]
pub struct GoInfo {
    /// The program invoked for every toolchain call. Normally `go` resolved
    /// from PATH; tests substitute a script here.
    pub path: PathBuf,
    /// Toolchain version, e.g. "1.22.1".
    pub version: String,
}

/// Locate the `go` binary on PATH and read its version.
///
/// # Errors
/// Returns an error if `go` cannot be executed or its version output is not
/// in the expected `go version goX.Y.Z os/arch` form.
pub fn detect_go() -> Result<GoInfo, GotoolError> {
    detect_go_at(&PathBuf::from("go"))
}

/// Like [`detect_go`], for an explicit program path.
///
/// # Errors
/// Returns an error if the program cannot be executed or does not report a
/// parseable version.
pub fn detect_go_at(program: &Path) -> Result<GoInfo, GotoolError> {
    let output =
        run_command(Command::new(program).arg("version")).map_err(|e| GotoolError::GoNotFound {
            message: e.to_string(),
        })?;

    if !output.success {
        return Err(GotoolError::GoNotFound {
            message: output.stderr.trim().to_owned(),
        });
    }

    let version =
        parse_go_version(&output.stdout).ok_or_else(|| GotoolError::UnparsableVersion {
            output: output.stdout.trim().to_owned(),
        })?;

    Ok(GoInfo {
        path: program.to_path_buf(),
        version,
    })
}

/// Extract "X.Y.Z" from `go version goX.Y.Z os/arch`.
fn parse_go_version(stdout: &str) -> Option<String> {
    stdout
        .split_whitespace()
        .find_map(|word| {
            word.strip_prefix("go")
                .filter(|v| v.chars().next().is_some_and(|c| c.is_ascii_digit()))
        })
        .map(str::to_owned)
}

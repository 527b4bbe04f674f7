//! Formatter and static-check pass-throughs.
//!
//! These commands have no orchestration logic of their own: they hand the
//! configured directories or package patterns to the external tool, stream
//! its output, and propagate its exit status.

use std::path::Path;
use std::process::Command;

use shipyard_config::manifest::ChecksConfig;
use shipyard_gotool::GoInfo;
use shipyard_util::process::run_status;

use crate::error::EngineError;

/// Run `gofmt -s -w` over the configured directories.
///
/// # Errors
/// Returns an error if `gofmt` cannot be spawned or exits non-zero.
pub fn fmt(repo_root: &Path, config: &ChecksConfig) -> Result<(), EngineError> {
    fmt_with(Path::new("gofmt"), repo_root, config)
}

/// Like [`fmt`], for an explicit formatter program.
///
/// # Errors
/// Returns an error if the formatter cannot be spawned or exits non-zero.
pub fn fmt_with(program: &Path, repo_root: &Path, config: &ChecksConfig) -> Result<(), EngineError> {
    eprintln!("    Formatting {}", config.dirs.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(["-s", "-w"])
        .args(&config.dirs)
        .current_dir(repo_root);
    finish("gofmt", run_status(&mut cmd)?)
}

/// Run `go vet` over the configured packages.
///
/// # Errors
/// Returns an error if the toolchain cannot be spawned or vet finds
/// problems.
pub fn vet(repo_root: &Path, go: &GoInfo, config: &ChecksConfig) -> Result<(), EngineError> {
    eprintln!("    Vetting {}", config.packages.join(" "));
    let mut cmd = Command::new(&go.path);
    cmd.arg("vet").args(&config.packages).current_dir(repo_root);
    finish("go vet", run_status(&mut cmd)?)
}

/// Run `golint` over the configured packages.
///
/// # Errors
/// Returns an error if `golint` cannot be spawned or exits non-zero.
pub fn lint(repo_root: &Path, config: &ChecksConfig) -> Result<(), EngineError> {
    lint_with(Path::new("golint"), repo_root, config)
}

/// Like [`lint`], for an explicit linter program.
///
/// # Errors
/// Returns an error if the linter cannot be spawned or exits non-zero.
pub fn lint_with(
    program: &Path,
    repo_root: &Path,
    config: &ChecksConfig,
) -> Result<(), EngineError> {
    eprintln!("    Linting {}", config.packages.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(&config.packages).current_dir(repo_root);
    finish("golint", run_status(&mut cmd)?)
}

fn finish(tool: &str, status: shipyard_util::process::CommandStatus) -> Result<(), EngineError> {
    if status.success {
        Ok(())
    } else {
        Err(EngineError::CheckFailed {
            tool: tool.to_owned(),
            exit_code: status.exit_code.unwrap_or(1),
        })
    }
}

//! Process execution helpers for Shipyard.

use std::process::Command;

use crate::error::UtilError;

/// Structured output from a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

/// Exit information from a streamed command execution.
#[derive(Debug)]
pub struct CommandStatus {
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Execute a command and capture its output.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
/// A non-zero exit code is **not** an error; check `CommandOutput::success`
/// instead.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let program = program_name(cmd);
    let output = cmd
        .output()
        .map_err(|source| UtilError::CommandExec { program, source })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}

/// Execute a command with stdio inherited from this process.
///
/// Used for long-running external tools (compiler, test runner, formatter)
/// whose output should stream straight to the user. The call blocks until
/// the child exits.
///
/// # Errors
/// Returns an error if the command cannot be spawned. A non-zero exit code
/// is **not** an error; check `CommandStatus::success` instead.
pub fn run_status(cmd: &mut Command) -> Result<CommandStatus, UtilError> {
    let program = program_name(cmd);
    let status = cmd
        .status()
        .map_err(|source| UtilError::CommandExec { program, source })?;

    Ok(CommandStatus {
        success: status.success(),
        exit_code: status.code(),
    })
}

//! Error types for shipyard-engine.

use shipyard_targets::{Arch, Platform};

/// Errors produced by engine operations.
///
/// Every variant is fatal to the current invocation; nothing is retried.
/// Variants carrying an `exit_code` wrap an external command failure, and
/// the code is the command's own (a process killed by a signal reports 1).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] shipyard_util::error::UtilError),

    /// A configuration operation failed.
    #[error("{0}")]
    Config(#[from] shipyard_config::ConfigError),

    /// A target validation failed.
    #[error("{0}")]
    Target(#[from] shipyard_targets::TargetError),

    /// A toolchain operation failed.
    #[error("{0}")]
    Gotool(#[from] shipyard_gotool::GotoolError),

    /// Version-control state could not be read.
    #[error("build metadata unavailable: {message}")]
    MetadataUnavailable { message: String },

    /// The compiler exited non-zero for one target.
    #[error("build failed for {name} {platform}/{arch} (exit code {exit_code})")]
    BuildFailed {
        name: String,
        platform: Platform,
        arch: Arch,
        exit_code: i32,
    },

    /// An artifact upload failed; remaining uploads were not attempted.
    #[error("upload failed for {object}: {message}")]
    UploadFailed {
        object: String,
        message: String,
        exit_code: i32,
    },

    /// The version registry could not be notified.
    #[error("registry update failed for {url}: {message}")]
    RegistryUpdateFailed { url: String, message: String },

    /// `go install` failed before test dispatch.
    #[error("install failed (exit code {exit_code}) — tests require installed binaries")]
    InstallFailed { exit_code: i32 },

    /// The requested test class token is not recognized.
    #[error("unknown test class \"{token}\" — expected one of: unit, e2e, minikube, integration")]
    UnknownTestClass { token: String },

    /// The test runner reported failures.
    #[error("{class} tests failed (exit code {exit_code})")]
    TestsFailed { class: String, exit_code: i32 },

    /// A formatter or static check exited non-zero.
    #[error("{tool} reported problems (exit code {exit_code})")]
    CheckFailed { tool: String, exit_code: i32 },

    /// The deployment template has no parseable documents or a Deployment
    /// document missing the expected container structure.
    #[error("malformed deployment manifest {path}: {message}")]
    ManifestMalformed { path: String, message: String },
}

impl EngineError {
    /// The exit code of the failed external command, when the error wraps
    /// one. The CLI propagates this unchanged as the process exit code.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            EngineError::BuildFailed { exit_code, .. }
            | EngineError::UploadFailed { exit_code, .. }
            | EngineError::InstallFailed { exit_code }
            | EngineError::TestsFailed { exit_code, .. }
            | EngineError::CheckFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

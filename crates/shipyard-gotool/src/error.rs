//! Error types for shipyard-gotool.

/// Errors produced when locating or invoking the Go toolchain.
#[derive(Debug, thiserror::Error)]
pub enum GotoolError {
    /// The `go` binary could not be executed at all.
    #[error("cannot run the Go toolchain: {message} — is `go` on PATH?")]
    GoNotFound { message: String },

    /// `go version` produced output we cannot interpret.
    #[error("cannot parse `go version` output: {output:?}")]
    UnparsableVersion { output: String },

    /// A build command was constructed without an output path.
    #[error("no output path set for build command")]
    NoOutput,

    /// A test command was constructed without any packages.
    #[error("no packages set for test command")]
    NoPackages,

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] shipyard_util::error::UtilError),
}

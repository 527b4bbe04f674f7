//! Builders for `go build` and `go test` invocations.

use std::path::{Path, PathBuf};
use std::process::Command;

use shipyard_targets::{Arch, Platform};
use shipyard_util::process::{run_status, CommandStatus};

use crate::detect::GoInfo;
use crate::error::GotoolError;

/// Build identity embedded into every binary via `-ldflags -X`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdFlags {
    pub version: String,
    pub commit: String,
    pub build_date: String,
}

impl LdFlags {
    /// Render the linker flag string the Go toolchain expects.
    pub fn to_flag_string(&self) -> String {
        format!(
            "-X main.Version={} -X main.GitCommit={} -X main.BuildTimestamp={}",
            self.version, self.commit, self.build_date
        )
    }
}

/// Builder for one cross-compilation invocation.
#[derive(Debug, Default)]
pub struct GoBuildCommand {
    main_pkg: String,
    output: Option<PathBuf>,
    target: Option<(Platform, Arch)>,
    cgo: bool,
    ldflags: Option<LdFlags>,
}

impl GoBuildCommand {
    /// Create a new builder compiling the current package (`.`).
    pub fn new() -> Self {
        GoBuildCommand {
            main_pkg: ".".to_owned(),
            ..GoBuildCommand::default()
        }
    }

    /// Set the main package selector.
    pub fn main_pkg(mut self, pkg: &str) -> Self {
        self.main_pkg = pkg.to_owned();
        self
    }

    /// Set the output binary path.
    pub fn output(mut self, path: &Path) -> Self {
        self.output = Some(path.to_path_buf());
        self
    }

    /// Set the `(platform, arch)` pair to cross-compile for.
    pub fn target(mut self, platform: Platform, arch: Arch) -> Self {
        self.target = Some((platform, arch));
        self
    }

    /// Enable cgo. Disabled by default so binaries stay statically linked.
    pub fn cgo(mut self, enabled: bool) -> Self {
        self.cgo = enabled;
        self
    }

    /// Embed build identity as linker-settable constants.
    pub fn ldflags(mut self, flags: LdFlags) -> Self {
        self.ldflags = Some(flags);
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if no output path is set.
    pub fn build_args(&self) -> Result<Vec<String>, GotoolError> {
        let Some(output) = &self.output else {
            return Err(GotoolError::NoOutput);
        };

        let mut args = vec!["build".to_owned()];
        args.push("-o".to_owned());
        args.push(output.display().to_string());
        if let Some(flags) = &self.ldflags {
            args.push("-ldflags".to_owned());
            args.push(flags.to_flag_string());
        }
        args.push(self.main_pkg.clone());
        Ok(args)
    }

    /// The environment the invocation runs under.
    ///
    /// `GOOS`/`GOARCH` select the cross-compilation target; `CGO_ENABLED`
    /// is always set explicitly so the host environment cannot leak in.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some((platform, arch)) = self.target {
            env.push(("GOOS".to_owned(), platform.goos().to_owned()));
            env.push(("GOARCH".to_owned(), arch.goarch().to_owned()));
        }
        let cgo = if self.cgo { "1" } else { "0" };
        env.push(("CGO_ENABLED".to_owned(), cgo.to_owned()));
        env
    }

    /// Run the compilation, streaming compiler output to the user.
    ///
    /// A non-zero compiler exit is reported in the returned status, not as
    /// an `Err`; the caller decides how to abort.
    ///
    /// # Errors
    /// Returns an error if no output path is set or the toolchain cannot be
    /// spawned.
    pub fn execute(&self, go: &GoInfo, cwd: &Path) -> Result<CommandStatus, GotoolError> {
        let args = self.build_args()?;
        let mut cmd = Command::new(&go.path);
        cmd.args(&args).current_dir(cwd);
        for (key, value) in self.env_pairs() {
            cmd.env(key, value);
        }
        Ok(run_status(&mut cmd)?)
    }
}

/// Builder for one `go test` invocation.
#[derive(Debug, Default)]
pub struct GoTestCommand {
    packages: Vec<String>,
    verbose: bool,
    timeout: Option<String>,
    runner_args: Vec<String>,
    passthrough: Vec<String>,
}

impl GoTestCommand {
    /// Create a new empty test command builder.
    pub fn new() -> Self {
        GoTestCommand::default()
    }

    /// Set the package patterns under test.
    pub fn packages(mut self, packages: &[String]) -> Self {
        self.packages = packages.to_vec();
        self
    }

    /// Enable `-v`.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Set the `-timeout` value (e.g. "10h").
    pub fn timeout(mut self, value: &str) -> Self {
        self.timeout = Some(value.to_owned());
        self
    }

    /// Flags forwarded to the test binary after `-args`.
    pub fn runner_args(mut self, args: &[&str]) -> Self {
        self.runner_args = args.iter().map(|a| (*a).to_owned()).collect();
        self
    }

    /// Caller-supplied arguments appended verbatim at the end.
    pub fn passthrough(mut self, args: &[String]) -> Self {
        self.passthrough = args.to_vec();
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if no packages are set.
    pub fn build_args(&self) -> Result<Vec<String>, GotoolError> {
        if self.packages.is_empty() {
            return Err(GotoolError::NoPackages);
        }

        let mut args = vec!["test".to_owned()];
        if self.verbose {
            args.push("-v".to_owned());
        }
        args.extend(self.packages.iter().cloned());
        if let Some(timeout) = &self.timeout {
            args.push("-timeout".to_owned());
            args.push(timeout.clone());
        }
        if !self.runner_args.is_empty() {
            args.push("-args".to_owned());
            args.extend(self.runner_args.iter().cloned());
        }
        args.extend(self.passthrough.iter().cloned());
        Ok(args)
    }

    /// Run the tests, streaming runner output to the user.
    ///
    /// # Errors
    /// Returns an error if no packages are set or the toolchain cannot be
    /// spawned.
    pub fn execute(&self, go: &GoInfo, cwd: &Path) -> Result<CommandStatus, GotoolError> {
        let args = self.build_args()?;
        let mut cmd = Command::new(&go.path);
        cmd.args(&args).current_dir(cwd);
        Ok(run_status(&mut cmd)?)
    }
}

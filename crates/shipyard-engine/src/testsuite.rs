//! Test dispatch: install binaries, then route one test class to its
//! `go test` invocation.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use shipyard_config::manifest::TestConfig;
use shipyard_gotool::{GoInfo, GoTestCommand};
use shipyard_util::process::run_status;

use crate::error::EngineError;

/// Flags every cluster-backed test class passes to the ginkgo runner.
const GINKGO_ARGS: [&str; 4] = ["-ginkgo.v", "-ginkgo.progress", "-ginkgo.trace", "-v=2"];

/// The recognized test classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestClass {
    /// Fast local tests; no timeout override, no cluster flags.
    Unit,
    /// Full end-to-end suite against a configured cluster.
    E2e,
    /// End-to-end suite against a local minikube cluster.
    Minikube,
    /// End-to-end suite run from inside the cluster.
    Integration,
}

impl TestClass {
    pub fn name(self) -> &'static str {
        match self {
            TestClass::Unit => "unit",
            TestClass::E2e => "e2e",
            TestClass::Minikube => "minikube",
            TestClass::Integration => "integration",
        }
    }
}

impl FromStr for TestClass {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit" => Ok(TestClass::Unit),
            "e2e" => Ok(TestClass::E2e),
            "minikube" => Ok(TestClass::Minikube),
            "integration" | "intg" => Ok(TestClass::Integration),
            other => Err(EngineError::UnknownTestClass {
                token: other.to_owned(),
            }),
        }
    }
}

/// The `go test` invocation for one class.
///
/// `unit` runs the configured unit packages plain; the cluster classes run
/// the e2e package with an extended timeout and verbose ginkgo diagnostics,
/// plus their class-specific cluster flag. Passthrough arguments append
/// verbatim for every class.
pub fn command_for(class: TestClass, config: &TestConfig, passthrough: &[String]) -> GoTestCommand {
    match class {
        TestClass::Unit => GoTestCommand::new()
            .verbose(true)
            .packages(&config.unit_packages)
            .passthrough(passthrough),
        TestClass::E2e => cluster_command(config, &[], passthrough),
        TestClass::Minikube => cluster_command(config, &["-cloud-provider=minikube"], passthrough),
        TestClass::Integration => cluster_command(config, &["-in-cluster=true"], passthrough),
    }
}

fn cluster_command(
    config: &TestConfig,
    extra_runner_args: &[&str],
    passthrough: &[String],
) -> GoTestCommand {
    let mut runner_args: Vec<&str> = GINKGO_ARGS.to_vec();
    runner_args.extend_from_slice(extra_runner_args);
    GoTestCommand::new()
        .verbose(true)
        .packages(std::slice::from_ref(&config.e2e_package))
        .timeout("10h")
        .runner_args(&runner_args)
        .passthrough(passthrough)
}

/// Install all of the project's binaries with `go install ./...`.
///
/// # Errors
/// Returns an error if the toolchain cannot be spawned or installation
/// fails.
pub fn install(repo_root: &Path, go: &GoInfo) -> Result<(), EngineError> {
    eprintln!("    Installing binaries (go install ./...)");
    let status = run_status(
        Command::new(&go.path)
            .args(["install", "./..."])
            .current_dir(repo_root),
    )?;
    if !status.success {
        return Err(EngineError::InstallFailed {
            exit_code: status.exit_code.unwrap_or(1),
        });
    }
    Ok(())
}

/// Where the dispatcher is in its install-then-run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Installing,
    Running,
    Done,
    Failed,
}

/// Installs the project's binaries, then dispatches exactly one test class.
#[derive(Debug)]
pub struct Dispatcher {
    repo_root: PathBuf,
    go: GoInfo,
    config: TestConfig,
    state: DispatchState,
}

impl Dispatcher {
    pub fn new(repo_root: &Path, go: GoInfo, config: TestConfig) -> Self {
        Dispatcher {
            repo_root: repo_root.to_path_buf(),
            go,
            config,
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Install binaries, then run the test class named by `token`.
    ///
    /// Installation happens before the token is inspected, so a typo still
    /// leaves freshly installed binaries behind — but no test runs against
    /// an unbuilt binary, and an unknown token never dispatches anything.
    ///
    /// # Errors
    /// Returns an error if installation fails, the token is unrecognized,
    /// or the test runner reports failures.
    pub fn run(&mut self, token: &str, passthrough: &[String]) -> Result<(), EngineError> {
        self.state = DispatchState::Installing;
        if let Err(e) = install(&self.repo_root, &self.go) {
            self.state = DispatchState::Failed;
            return Err(e);
        }

        let class = match token.parse::<TestClass>() {
            Ok(class) => class,
            Err(e) => {
                self.state = DispatchState::Failed;
                return Err(e);
            }
        };

        self.state = DispatchState::Running;
        eprintln!("    Running {} tests", class.name());

        let env_file = self.repo_root.join("hack").join("configs").join(".env");
        let extra_env = load_env_file(&env_file)?;

        let args = command_for(class, &self.config, passthrough).build_args()?;
        let mut cmd = Command::new(&self.go.path);
        cmd.args(&args).current_dir(&self.repo_root);
        for (key, value) in &extra_env {
            cmd.env(key, value);
        }

        let status = run_status(&mut cmd)?;
        if status.success {
            self.state = DispatchState::Done;
            Ok(())
        } else {
            self.state = DispatchState::Failed;
            Err(EngineError::TestsFailed {
                class: class.name().to_owned(),
                exit_code: status.exit_code.unwrap_or(1),
            })
        }
    }
}

/// Read `key=value` lines from an optional env file.
///
/// Returns an empty set when the file does not exist. Blank lines and
/// `#` comments are skipped.
fn load_env_file(path: &Path) -> Result<Vec<(String, String)>, EngineError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => {
            eprintln!("    Loading env file {}", path.display());
            content
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(EngineError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };
    Ok(parse_env_file(&content))
}

fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.split_once('=')
                .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        })
        .collect()
}

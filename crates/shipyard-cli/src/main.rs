#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use shipyard_config::{resolve_matrix, Environment, Manifest, Matrix};
use shipyard_engine::{CloudProvider, EngineError, Publisher};
use shipyard_gotool::GoInfo;

type CliResult = Result<(), EngineError>;

#[derive(Debug, Parser)]
#[command(name = "shipyard", about = "Build and release orchestration for multi-platform binaries")]
#[command(version)]
struct Cli {
    /// Build environment (defaults to $SHIPYARD_ENV, then dev)
    #[arg(long, global = true)]
    env: Option<Environment>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved build metadata
    Version,
    /// Format source directories with gofmt
    Fmt,
    /// Run go vet over the configured packages
    Vet,
    /// Run golint over the configured packages
    Lint,
    /// Cross-compile the target matrix (or a single binary)
    Build {
        /// Binary name; all matrix entries when omitted
        name: Option<String>,
    },
    /// Upload built artifacts to versioned cloud storage
    Publish {
        /// Binary name; every dist directory when omitted
        name: Option<String>,
    },
    /// Notify the version registry of the current version
    UpdateRegistry,
    /// Install all binaries locally
    Install,
    /// Install binaries, then run one test class
    Test {
        /// Test class: unit, e2e, minikube, or integration
        class: String,
        /// Arguments passed through to the test invocation
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Render the deployment manifest for a cloud provider
    RenderDeployment {
        /// Target cloud provider
        provider: CloudProvider,
        /// Template path (defaults to hack/deploy/deployments.yaml)
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let environment = cli.env.unwrap_or_else(Environment::from_env);

    let result = match cli.command {
        Command::Version => cmd_version(environment),
        Command::Fmt => cmd_fmt(),
        Command::Vet => cmd_vet(),
        Command::Lint => cmd_lint(),
        Command::Build { name } => cmd_build(environment, name.as_deref()),
        Command::Publish { name } => cmd_publish(environment, name.as_deref()),
        Command::UpdateRegistry => cmd_update_registry(environment),
        Command::Install => cmd_install(),
        Command::Test { class, args } => cmd_test(&class, &args),
        Command::RenderDeployment { provider, template } => {
            cmd_render_deployment(environment, provider, template)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(e.exit_code().unwrap_or(1));
    }
}

/// Find the project root by looking for `shipyard.toml` in the current
/// directory.
fn project_root() -> Result<PathBuf, EngineError> {
    let cwd = std::env::current_dir().map_err(|source| EngineError::Io {
        path: ".".to_owned(),
        source,
    })?;
    let manifest = cwd.join("shipyard.toml");
    if !manifest.exists() {
        return Err(EngineError::Io {
            path: manifest.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no shipyard.toml found in current directory",
            ),
        });
    }
    Ok(cwd)
}

fn load_manifest(root: &std::path::Path) -> Result<Manifest, EngineError> {
    Ok(Manifest::from_path(&root.join("shipyard.toml"))?)
}

/// The declared matrix, narrowed for the environment before anything reads
/// it.
fn effective_matrix(manifest: &Manifest, environment: Environment) -> Result<Matrix, EngineError> {
    let declared = Matrix::from_manifest(manifest)?;
    let host = shipyard_targets::host_pair()?;
    Ok(resolve_matrix(&declared, environment, host))
}

fn detect_go() -> Result<GoInfo, EngineError> {
    Ok(shipyard_gotool::detect_go()?)
}

fn cmd_version(environment: Environment) -> CliResult {
    let root = project_root()?;
    let metadata = shipyard_engine::resolve_metadata(&root, environment)?;
    for (key, value) in metadata.to_pairs() {
        println!("{key}={value}");
    }
    Ok(())
}

fn cmd_fmt() -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    shipyard_engine::checks::fmt(&root, &manifest.checks)
}

fn cmd_vet() -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    let go = detect_go()?;
    shipyard_engine::checks::vet(&root, &go, &manifest.checks)
}

fn cmd_lint() -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    shipyard_engine::checks::lint(&root, &manifest.checks)
}

fn cmd_build(environment: Environment, name: Option<&str>) -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    let matrix = effective_matrix(&manifest, environment)?;
    let metadata = shipyard_engine::resolve_metadata(&root, environment)?;
    let go = detect_go()?;

    // Sources are formatted before every build.
    shipyard_engine::checks::fmt(&root, &manifest.checks)?;

    let artifacts = match name {
        Some(name) => shipyard_engine::build_one(&root, &matrix, name, &metadata, &go)?,
        None => shipyard_engine::build_all(&root, &matrix, &metadata, &go)?,
    };

    eprintln!(
        "    Finished {} artifact(s) for version {}",
        artifacts.len(),
        metadata.version
    );
    Ok(())
}

fn cmd_publish(environment: Environment, name: Option<&str>) -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    let metadata = shipyard_engine::resolve_metadata(&root, environment)?;
    let bucket = manifest.bucket_for(environment)?;
    let publisher = Publisher::new(bucket);

    let dist = root.join("dist");
    let uploaded = match name {
        Some(name) => publisher.publish_dir(&dist.join(name), &metadata.version)?,
        None => publisher.publish_all(&dist, &metadata.version)?,
    };

    eprintln!(
        "    Published {uploaded} file(s) for version {}",
        metadata.version
    );
    Ok(())
}

fn cmd_update_registry(environment: Environment) -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    let metadata = shipyard_engine::resolve_metadata(&root, environment)?;
    shipyard_engine::registry::update_registry(&manifest, &metadata.version)
}

fn cmd_install() -> CliResult {
    let root = project_root()?;
    let go = detect_go()?;
    shipyard_engine::install(&root, &go)
}

fn cmd_test(class: &str, args: &[String]) -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    let go = detect_go()?;

    let mut dispatcher = shipyard_engine::Dispatcher::new(&root, go, manifest.test.clone());
    dispatcher.run(class, args)
}

fn cmd_render_deployment(
    environment: Environment,
    provider: CloudProvider,
    template: Option<PathBuf>,
) -> CliResult {
    let root = project_root()?;
    let manifest = load_manifest(&root)?;
    let metadata = shipyard_engine::resolve_metadata(&root, environment)?;

    let template = template
        .unwrap_or_else(|| root.join("hack").join("deploy").join("deployments.yaml"));
    let out = root.join("dist").join("kube.yaml");

    let summary = shipyard_engine::render_deployment(
        &template,
        &manifest.project.image,
        &metadata.version,
        provider,
        &out,
    )?;

    eprintln!(
        "    Rendered {} document(s) \u{2192} {}",
        summary.documents,
        out.display()
    );
    Ok(())
}

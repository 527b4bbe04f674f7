//! The `shipyard.toml` project manifest.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::environment::Environment;

/// The parsed `shipyard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub project: Project,
    /// Binary name → build configuration.
    #[serde(default)]
    pub bins: BTreeMap<String, BinConfig>,
    /// Environment name → cloud storage bucket URL.
    #[serde(default)]
    pub buckets: BTreeMap<String, String>,
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    /// Project name, reported to the version registry.
    pub name: String,
    /// Container image repository the deployment renderer tags with the
    /// build version (e.g. `example/svc`).
    pub image: String,
}

/// Build configuration for one binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinConfig {
    #[serde(default)]
    pub kind: BinKind,
    /// Main package path passed to the compiler.
    #[serde(default = "default_main")]
    pub main: String,
    /// Whether the binary needs cgo. Off by default so cross-compiled
    /// binaries stay statically linked.
    #[serde(default)]
    pub cgo: bool,
    /// Declared distribution: platform name → architecture names.
    pub distro: BTreeMap<String, Vec<String>>,
}

fn default_main() -> String {
    ".".to_owned()
}

/// The toolchain kind a binary is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinKind {
    #[default]
    Go,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Endpoint notified when a new version's artifacts are published.
    pub url: Option<String>,
}

/// Package selections for the test dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Packages run by the `unit` test class.
    #[serde(default = "default_unit_packages")]
    pub unit_packages: Vec<String>,
    /// Package run by the `e2e`, `minikube`, and `integration` classes.
    #[serde(default = "default_e2e_package")]
    pub e2e_package: String,
}

fn default_unit_packages() -> Vec<String> {
    vec!["./...".to_owned()]
}

fn default_e2e_package() -> String {
    "./test/e2e/...".to_owned()
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfig {
            unit_packages: default_unit_packages(),
            e2e_package: default_e2e_package(),
        }
    }
}

/// Targets for the formatter and static checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecksConfig {
    /// Directories handed to the formatter.
    #[serde(default = "default_dirs")]
    pub dirs: Vec<String>,
    /// Package patterns handed to `vet` and `lint`.
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
}

fn default_dirs() -> Vec<String> {
    vec![".".to_owned()]
}

fn default_packages() -> Vec<String> {
    vec!["./...".to_owned()]
}

impl Default for ChecksConfig {
    fn default() -> Self {
        ChecksConfig {
            dirs: default_dirs(),
            packages: default_packages(),
        }
    }
}

impl Manifest {
    /// Read and parse a `shipyard.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Manifest::from_str(&content, &path.display().to_string())
    }

    /// Parse manifest content, naming `origin` in errors.
    ///
    /// # Errors
    /// Returns an error if the content is not valid manifest TOML.
    pub fn from_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_owned(),
            source: e,
        })?;
        Ok(manifest)
    }

    /// Look up the storage bucket for `environment`.
    ///
    /// # Errors
    /// Returns an error if `[buckets]` has no entry for the environment.
    pub fn bucket_for(&self, environment: Environment) -> Result<&str, ConfigError> {
        self.buckets
            .get(&environment.to_string())
            .map(String::as_str)
            .ok_or(ConfigError::NoBucket { environment })
    }

    /// The registry endpoint, required by `update-registry`.
    ///
    /// # Errors
    /// Returns an error if `[registry]` does not set `url`.
    pub fn registry_url(&self) -> Result<&str, ConfigError> {
        self.registry
            .url
            .as_deref()
            .ok_or(ConfigError::NoRegistryUrl)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid shipyard.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("bin \"{bin}\" declares an invalid target: {source}")]
    InvalidTarget {
        bin: String,
        source: shipyard_targets::TargetError,
    },

    #[error("no [buckets] entry for environment \"{environment}\"")]
    NoBucket { environment: Environment },

    #[error("no [registry] url configured")]
    NoRegistryUrl,

    #[error("no [bins] entry named \"{name}\"")]
    UnknownBin { name: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[project]
name = "svc"
image = "example/svc"

[bins.svc]
cgo = false

[bins.svc.distro]
alpine = ["amd64"]
darwin = ["amd64"]
linux = ["amd64", "arm64"]

[buckets]
prod = "gs://example-cdn"
dev = "gs://example-dev"

[registry]
url = "https://registry.example.com/api/versions"

[test]
unit_packages = [".", "./apis/...", "./pkg/..."]
e2e_package = "./test/e2e/..."

[checks]
dirs = ["cmd", "apis", "pkg"]
packages = ["./apis/...", "./pkg/..."]
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = Manifest::from_str(FULL, "shipyard.toml").unwrap();
        assert_eq!(manifest.project.name, "svc");
        assert_eq!(manifest.project.image, "example/svc");

        let bin = manifest.bins.get("svc").unwrap();
        assert_eq!(bin.kind, BinKind::Go);
        assert!(!bin.cgo);
        assert_eq!(bin.main, ".");
        assert_eq!(bin.distro.len(), 3);
        assert_eq!(
            bin.distro.get("linux"),
            Some(&vec!["amd64".to_owned(), "arm64".to_owned()])
        );
    }

    #[test]
    fn parse_minimal_manifest_uses_defaults() {
        let manifest = Manifest::from_str(
            "[project]\nname = \"svc\"\nimage = \"example/svc\"\n",
            "shipyard.toml",
        )
        .unwrap();
        assert!(manifest.bins.is_empty());
        assert_eq!(manifest.test.unit_packages, vec!["./..."]);
        assert_eq!(manifest.test.e2e_package, "./test/e2e/...");
        assert_eq!(manifest.checks.dirs, vec!["."]);
        assert_eq!(manifest.checks.packages, vec!["./..."]);
        assert!(manifest.registry.url.is_none());
    }

    #[test]
    fn bucket_for_known_environment() {
        let manifest = Manifest::from_str(FULL, "shipyard.toml").unwrap();
        assert_eq!(
            manifest.bucket_for(Environment::Prod).unwrap(),
            "gs://example-cdn"
        );
        assert_eq!(
            manifest.bucket_for(Environment::Dev).unwrap(),
            "gs://example-dev"
        );
    }

    #[test]
    fn bucket_for_missing_environment() {
        let manifest = Manifest::from_str(FULL, "shipyard.toml").unwrap();
        let err = manifest.bucket_for(Environment::Qa).unwrap_err();
        assert!(err.to_string().contains("qa"));
    }

    #[test]
    fn registry_url_missing_is_error() {
        let manifest = Manifest::from_str(
            "[project]\nname = \"svc\"\nimage = \"example/svc\"\n",
            "shipyard.toml",
        )
        .unwrap();
        assert!(manifest.registry_url().is_err());
    }

    #[test]
    fn unknown_field_rejected() {
        let result = Manifest::from_str(
            "[project]\nname = \"svc\"\nimage = \"i\"\nbogus = 1\n",
            "shipyard.toml",
        );
        assert!(result.is_err());
    }

    #[test]
    fn from_path_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Manifest::from_path(&tmp.path().join("shipyard.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn from_path_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shipyard.toml");
        std::fs::write(&path, FULL).unwrap();
        let manifest = Manifest::from_path(&path).unwrap();
        assert_eq!(manifest.project.name, "svc");
    }
}

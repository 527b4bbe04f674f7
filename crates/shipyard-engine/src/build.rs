//! Matrix build execution: one cross-compilation per declared target pair.

use std::path::{Path, PathBuf};

use shipyard_config::{Matrix, MatrixEntry};
use shipyard_gotool::{GoBuildCommand, GoInfo, LdFlags};
use shipyard_targets::{check_supported, Arch, Platform};

use crate::error::EngineError;
use crate::metadata::BuildMetadata;

/// One compiled binary for one `(name, platform, arch)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub platform: Platform,
    pub arch: Arch,
    pub path: PathBuf,
}

/// The output path for one artifact: `dist/<name>/<name>-<platform>-<arch>`.
///
/// Windows binaries get the `.exe` suffix the platform expects.
pub fn artifact_path(dist: &Path, name: &str, platform: Platform, arch: Arch) -> PathBuf {
    let mut file = format!("{name}-{platform}-{arch}");
    if platform == Platform::Windows {
        file.push_str(".exe");
    }
    dist.join(name).join(file)
}

/// Build every entry of the resolved matrix, sequentially and fail-fast.
///
/// Each entry builds every pair of its distro in canonical order. The first
/// compiler failure aborts the run with the compiler's exit code preserved;
/// no later pair is attempted.
///
/// # Errors
/// Returns an error on the first validation or compiler failure.
pub fn build_all(
    repo_root: &Path,
    matrix: &Matrix,
    metadata: &BuildMetadata,
    go: &GoInfo,
) -> Result<Vec<Artifact>, EngineError> {
    let mut artifacts = Vec::new();
    for entry in matrix.entries.values() {
        artifacts.extend(build_entry(repo_root, entry, metadata, go)?);
    }
    Ok(artifacts)
}

/// Build a single named entry of the resolved matrix.
///
/// # Errors
/// Returns an error if the name is not in the matrix, or on the first
/// compiler failure.
pub fn build_one(
    repo_root: &Path,
    matrix: &Matrix,
    name: &str,
    metadata: &BuildMetadata,
    go: &GoInfo,
) -> Result<Vec<Artifact>, EngineError> {
    let entry = matrix.entry(name)?;
    build_entry(repo_root, entry, metadata, go)
}

/// Compile one entry for every pair in its distro.
fn build_entry(
    repo_root: &Path,
    entry: &MatrixEntry,
    metadata: &BuildMetadata,
    go: &GoInfo,
) -> Result<Vec<Artifact>, EngineError> {
    let dist = repo_root.join("dist");
    let ldflags = LdFlags {
        version: metadata.version.clone(),
        commit: metadata.commit.clone(),
        build_date: metadata.build_date.clone(),
    };

    let mut artifacts = Vec::new();
    for (platform, arch) in entry.pairs() {
        check_supported(platform, arch)?;

        let output = artifact_path(&dist, &entry.name, platform, arch);
        if let Some(parent) = output.parent() {
            shipyard_util::fs::ensure_dir(parent)?;
        }

        eprintln!(
            "    Building {} {platform}/{arch} \u{2192} {}",
            entry.name,
            output.display()
        );

        let status = GoBuildCommand::new()
            .main_pkg(&entry.main)
            .output(&output)
            .target(platform, arch)
            .cgo(entry.cgo)
            .ldflags(ldflags.clone())
            .execute(go, repo_root)?;

        if !status.success {
            return Err(EngineError::BuildFailed {
                name: entry.name.clone(),
                platform,
                arch,
                exit_code: status.exit_code.unwrap_or(1),
            });
        }

        artifacts.push(Artifact {
            name: entry.name.clone(),
            platform,
            arch,
            path: output,
        });
    }
    Ok(artifacts)
}

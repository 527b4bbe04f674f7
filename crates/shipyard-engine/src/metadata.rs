//! Build identity resolution from version-control state.

use std::path::Path;
use std::process::Command;

use chrono::{SecondsFormat, Utc};
use shipyard_config::Environment;
use shipyard_util::process::run_command;

use crate::error::EngineError;

/// The resolved identity of one build invocation.
///
/// Resolved once per run and passed by value into every component that
/// needs it; never cached across runs. All artifacts produced in one
/// invocation carry the same metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Semantic version derived from tags and commit distance, without a
    /// leading `v` (e.g. `1.2.3` or `1.2.3-4-gabc1234`).
    pub version: String,
    /// Full commit hash of HEAD.
    pub commit: String,
    /// Whether the working tree had uncommitted changes.
    pub dirty: bool,
    /// RFC 3339 UTC timestamp of metadata resolution.
    pub build_date: String,
    /// The environment this build runs for.
    pub environment: Environment,
}

impl BuildMetadata {
    /// The metadata as sorted `(key, value)` pairs, for `shipyard version`.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("build_date", self.build_date.clone()),
            ("commit", self.commit.clone()),
            ("dirty", self.dirty.to_string()),
            ("environment", self.environment.to_string()),
            ("version", self.version.clone()),
        ]
    }
}

/// Resolve build metadata from the repository at `repo_root`.
///
/// A pure read: `git describe --tags --always --dirty` supplies the version
/// (tag, or tag-distance-hash, falling back to the short commit hash in an
/// untagged repository) and `git rev-parse HEAD` the commit. Two calls
/// against an unmodified repository yield the same version and commit.
///
/// # Errors
/// Returns `MetadataUnavailable` if `git` cannot run, the directory is not
/// a repository, or it has no commits.
pub fn resolve_metadata(
    repo_root: &Path,
    environment: Environment,
) -> Result<BuildMetadata, EngineError> {
    let described = git(repo_root, &["describe", "--tags", "--always", "--dirty"])?;
    let commit = git(repo_root, &["rev-parse", "HEAD"])?;

    let dirty = described.ends_with("-dirty");
    // Tags are conventionally `vX.Y.Z`; the embedded version is bare.
    let version = described.strip_prefix('v').unwrap_or(&described).to_owned();

    Ok(BuildMetadata {
        version,
        commit,
        dirty,
        build_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        environment,
    })
}

/// Run one git command in `repo_root` and return its trimmed stdout.
fn git(repo_root: &Path, args: &[&str]) -> Result<String, EngineError> {
    let output = run_command(Command::new("git").args(args).current_dir(repo_root)).map_err(
        |e| EngineError::MetadataUnavailable {
            message: e.to_string(),
        },
    )?;

    if !output.success {
        return Err(EngineError::MetadataUnavailable {
            message: output.stderr.trim().to_owned(),
        });
    }
    Ok(output.stdout.trim().to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Initialize a repository with one commit; None when git is not usable
    /// in the test environment.
    fn init_repo() -> Option<tempfile::TempDir> {
        let tmp = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(tmp.path())
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .output()
                .ok()
                .filter(|o| o.status.success())
                .is_some()
        };
        if !run(&["init"]) {
            return None;
        }
        std::fs::write(tmp.path().join("file"), "content").unwrap();
        if !run(&["add", "."]) || !run(&["commit", "-m", "initial"]) {
            return None;
        }
        Some(tmp)
    }

    #[test]
    fn resolve_fails_outside_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let result = resolve_metadata(tmp.path(), Environment::Dev);
        assert!(matches!(
            result,
            Err(EngineError::MetadataUnavailable { .. })
        ));
    }

    #[test]
    fn resolve_is_deterministic_for_unchanged_state() {
        let Some(repo) = init_repo() else { return };

        let first = resolve_metadata(repo.path(), Environment::Dev).unwrap();
        let second = resolve_metadata(repo.path(), Environment::Dev).unwrap();
        assert_eq!(first.version, second.version);
        assert_eq!(first.commit, second.commit);
        assert_eq!(first.dirty, second.dirty);
    }

    #[test]
    fn resolve_records_environment() {
        let Some(repo) = init_repo() else { return };

        let metadata = resolve_metadata(repo.path(), Environment::Prod).unwrap();
        assert_eq!(metadata.environment, Environment::Prod);
        assert!(!metadata.version.is_empty());
        assert_eq!(metadata.commit.len(), 40);
    }

    #[test]
    fn resolve_strips_v_prefix_from_tags() {
        let Some(repo) = init_repo() else { return };
        let tagged = Command::new("git")
            .args(["tag", "v1.2.3"])
            .current_dir(repo.path())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !tagged {
            return;
        }

        let metadata = resolve_metadata(repo.path(), Environment::Dev).unwrap();
        assert_eq!(metadata.version, "1.2.3");
        assert!(!metadata.dirty);
    }

    #[test]
    fn resolve_marks_dirty_tree() {
        let Some(repo) = init_repo() else { return };
        std::fs::write(repo.path().join("file"), "changed").unwrap();

        let metadata = resolve_metadata(repo.path(), Environment::Dev).unwrap();
        assert!(metadata.dirty);
        assert!(metadata.version.ends_with("-dirty"));
    }

    #[test]
    fn pairs_are_sorted_by_key() {
        let metadata = BuildMetadata {
            version: "1.2.3".to_owned(),
            commit: "abc".to_owned(),
            dirty: false,
            build_date: "2024-01-01T00:00:00Z".to_owned(),
            environment: Environment::Dev,
        };
        let pairs = metadata.to_pairs();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}

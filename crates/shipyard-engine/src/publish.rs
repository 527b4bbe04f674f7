//! Artifact publishing: checksum side-files and versioned cloud uploads.

use std::path::{Path, PathBuf};
use std::process::Command;

use shipyard_util::fs::{list_regular_files, list_subdirs, remove_matching};
use shipyard_util::hash::sha256_file;
use shipyard_util::process::run_command;

use crate::error::EngineError;

/// Checksum side-file extensions treated as stale leftovers of a previous
/// publish. All are removed before anything is hashed or uploaded.
const STALE_PATTERNS: [&str; 3] = ["*.md5", "*.sha1", "*.sha256"];

/// Uploads a local artifact tree to versioned cloud storage.
///
/// Object paths are `<bucket>/binaries/<name>/<version>/<file>`, so
/// re-publishing the same version overwrites the same objects rather than
/// creating duplicates.
#[derive(Debug, Clone)]
pub struct Publisher {
    bucket: String,
    uploader: PathBuf,
}

impl Publisher {
    /// A publisher uploading into `bucket` with the standard storage CLI.
    pub fn new(bucket: &str) -> Self {
        Publisher {
            bucket: bucket.to_owned(),
            uploader: PathBuf::from("gsutil"),
        }
    }

    /// Replace the storage command. Tests substitute a script here.
    pub fn with_uploader(mut self, program: &Path) -> Self {
        self.uploader = program.to_path_buf();
        self
    }

    /// Publish every per-binary directory under `dist_root`.
    ///
    /// Returns the number of files uploaded. An absent or empty `dist_root`
    /// publishes nothing.
    ///
    /// # Errors
    /// Returns an error on the first failed removal, hash, or upload.
    pub fn publish_all(&self, dist_root: &Path, version: &str) -> Result<usize, EngineError> {
        let mut uploaded = 0usize;
        for bindir in list_subdirs(dist_root)? {
            uploaded = uploaded.saturating_add(self.publish_dir(&bindir, version)?);
        }
        Ok(uploaded)
    }

    /// Publish one binary's directory.
    ///
    /// Stale checksum side-files are removed first, then every remaining
    /// regular file is hashed, paired with a fresh `.sha256` side-file, and
    /// both are uploaded. Uploads stop at the first failure.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read, a hash or side-file
    /// write fails, or an upload exits non-zero.
    pub fn publish_dir(&self, bindir: &Path, version: &str) -> Result<usize, EngineError> {
        for pattern in STALE_PATTERNS {
            remove_matching(bindir, pattern)?;
        }

        let name = bindir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut uploaded = 0usize;
        for file in list_regular_files(bindir)? {
            let digest = sha256_file(&file)?;
            let sidecar = sidecar_path(&file);
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            std::fs::write(&sidecar, format!("{digest}  {file_name}\n")).map_err(|source| {
                EngineError::Io {
                    path: sidecar.display().to_string(),
                    source,
                }
            })?;

            self.upload(&file, &name, version)?;
            self.upload(&sidecar, &name, version)?;
            uploaded = uploaded.saturating_add(2);
        }
        Ok(uploaded)
    }

    /// The destination object path for one local file.
    pub fn object_path(&self, name: &str, version: &str, file_name: &str) -> String {
        format!("{}/binaries/{name}/{version}/{file_name}", self.bucket)
    }

    fn upload(&self, local: &Path, name: &str, version: &str) -> Result<(), EngineError> {
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dest = self.object_path(name, version, &file_name);

        eprintln!("    Uploading {file_name} \u{2192} {dest}");

        let output = run_command(
            Command::new(&self.uploader)
                .arg("cp")
                .arg(local)
                .arg(&dest),
        )
        .map_err(|e| EngineError::UploadFailed {
            object: dest.clone(),
            message: e.to_string(),
            exit_code: 1,
        })?;

        if !output.success {
            return Err(EngineError::UploadFailed {
                object: dest,
                message: output.stderr.trim().to_owned(),
                exit_code: output.exit_code.unwrap_or(1),
            });
        }
        Ok(())
    }
}

/// `<file>.sha256` next to the file.
fn sidecar_path(file: &Path) -> PathBuf {
    let mut os = file.as_os_str().to_owned();
    os.push(".sha256");
    PathBuf::from(os)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    /// An uploader stand-in that logs `cp <src> <dest>` lines.
    #[cfg(unix)]
    fn fake_uploader(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("uploader");
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn object_path_is_keyed_by_version() {
        let publisher = Publisher::new("gs://example-cdn");
        assert_eq!(
            publisher.object_path("svc", "1.2.3", "svc-linux-amd64"),
            "gs://example-cdn/binaries/svc/1.2.3/svc-linux-amd64"
        );
    }

    #[test]
    fn sidecar_path_appends_extension() {
        assert_eq!(
            sidecar_path(Path::new("dist/svc/svc-linux-amd64")),
            Path::new("dist/svc/svc-linux-amd64.sha256")
        );
    }

    #[test]
    fn publish_all_empty_dist_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Publisher::new("gs://example-dev");
        let uploaded = publisher
            .publish_all(&tmp.path().join("dist"), "1.2.3")
            .unwrap();
        assert_eq!(uploaded, 0);
    }

    #[cfg(unix)]
    #[test]
    fn publish_dir_strips_stale_side_files_and_uploads() {
        let tmp = tempfile::tempdir().unwrap();
        let bindir = tmp.path().join("dist").join("svc");
        fs::create_dir_all(&bindir).unwrap();
        fs::write(bindir.join("svc-linux-amd64"), b"binary").unwrap();
        fs::write(bindir.join("svc-linux-amd64.md5"), b"stale").unwrap();
        fs::write(bindir.join("svc-linux-amd64.sha1"), b"stale").unwrap();
        fs::write(bindir.join("old.sha256"), b"stale").unwrap();

        let log = tmp.path().join("uploads.log");
        let uploader = fake_uploader(tmp.path(), &format!("echo \"$@\" >> {}", log.display()));

        let publisher = Publisher::new("gs://example-dev").with_uploader(&uploader);
        let uploaded = publisher.publish_dir(&bindir, "1.2.3").unwrap();

        // One binary + one fresh checksum.
        assert_eq!(uploaded, 2);
        assert!(!bindir.join("svc-linux-amd64.md5").exists());
        assert!(!bindir.join("svc-linux-amd64.sha1").exists());
        assert!(!bindir.join("old.sha256").exists());

        // The fresh side-file holds the real digest in `sha256sum` form.
        let sidecar = fs::read_to_string(bindir.join("svc-linux-amd64.sha256")).unwrap();
        assert!(sidecar.starts_with(&shipyard_util::hash::sha256_bytes(b"binary")));
        assert!(sidecar.trim().ends_with("svc-linux-amd64"));

        let logged = fs::read_to_string(&log).unwrap();
        assert!(logged.contains("cp"));
        assert!(logged.contains("gs://example-dev/binaries/svc/1.2.3/svc-linux-amd64"));
        assert!(logged.contains("gs://example-dev/binaries/svc/1.2.3/svc-linux-amd64.sha256"));
    }

    #[cfg(unix)]
    #[test]
    fn publish_is_idempotent_for_unchanged_binaries() {
        let tmp = tempfile::tempdir().unwrap();
        let bindir = tmp.path().join("dist").join("svc");
        fs::create_dir_all(&bindir).unwrap();
        fs::write(bindir.join("svc-linux-amd64"), b"binary").unwrap();

        let log = tmp.path().join("uploads.log");
        let uploader = fake_uploader(tmp.path(), &format!("echo \"$@\" >> {}", log.display()));
        let publisher = Publisher::new("gs://example-dev").with_uploader(&uploader);

        let first = publisher.publish_dir(&bindir, "1.2.3").unwrap();
        let sidecar_after_first =
            fs::read_to_string(bindir.join("svc-linux-amd64.sha256")).unwrap();
        let second = publisher.publish_dir(&bindir, "1.2.3").unwrap();
        let sidecar_after_second =
            fs::read_to_string(bindir.join("svc-linux-amd64.sha256")).unwrap();

        assert_eq!(first, second);
        assert_eq!(sidecar_after_first, sidecar_after_second);

        // Both runs target the same object paths — overwrite, not duplicate.
        let logged = fs::read_to_string(&log).unwrap();
        let dests: Vec<&str> = logged
            .lines()
            .filter_map(|l| l.split_whitespace().last())
            .collect();
        assert_eq!(dests.len(), 4);
        assert_eq!(dests.get(0).unwrap(), dests.get(2).unwrap());
        assert_eq!(dests.get(1).unwrap(), dests.get(3).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn upload_failure_halts_remaining_uploads() {
        let tmp = tempfile::tempdir().unwrap();
        let bindir = tmp.path().join("dist").join("svc");
        fs::create_dir_all(&bindir).unwrap();
        fs::write(bindir.join("a-first"), b"a").unwrap();
        fs::write(bindir.join("b-second"), b"b").unwrap();

        let log = tmp.path().join("uploads.log");
        let uploader = fake_uploader(
            tmp.path(),
            &format!("echo \"$@\" >> {}\necho boom >&2\nexit 5", log.display()),
        );
        let publisher = Publisher::new("gs://example-dev").with_uploader(&uploader);

        let result = publisher.publish_dir(&bindir, "1.2.3");
        match result {
            Err(EngineError::UploadFailed {
                message, exit_code, ..
            }) => {
                assert_eq!(message, "boom");
                assert_eq!(exit_code, 5);
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }

        // Only the first file's upload was attempted.
        let logged = fs::read_to_string(&log).unwrap();
        assert_eq!(logged.lines().count(), 1);
        assert!(logged.contains("a-first"));
        assert!(!logged.contains("b-second"));
    }

    #[cfg(unix)]
    #[test]
    fn publish_all_walks_every_binary_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dist = tmp.path().join("dist");
        for name in ["alpha", "beta"] {
            let dir = dist.join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("{name}-linux-amd64")), name.as_bytes()).unwrap();
        }

        let log = tmp.path().join("uploads.log");
        let uploader = fake_uploader(tmp.path(), &format!("echo \"$@\" >> {}", log.display()));
        let publisher = Publisher::new("gs://example-dev").with_uploader(&uploader);

        let uploaded = publisher.publish_all(&dist, "2.0.0").unwrap();
        assert_eq!(uploaded, 4);

        let logged = fs::read_to_string(&log).unwrap();
        assert!(logged.contains("/binaries/alpha/2.0.0/alpha-linux-amd64"));
        assert!(logged.contains("/binaries/beta/2.0.0/beta-linux-amd64"));
    }

    #[cfg(unix)]
    #[test]
    fn missing_uploader_is_upload_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let bindir = tmp.path().join("dist").join("svc");
        fs::create_dir_all(&bindir).unwrap();
        fs::write(bindir.join("svc-linux-amd64"), b"binary").unwrap();

        let publisher =
            Publisher::new("gs://example-dev").with_uploader(Path::new("/nonexistent/gsutil"));
        let result = publisher.publish_dir(&bindir, "1.2.3");
        assert!(matches!(result, Err(EngineError::UploadFailed { .. })));
    }
}

//! The effective target matrix: typed, validated, environment-resolved.

use std::collections::BTreeMap;

use shipyard_targets::{check_supported, Arch, Platform};

use crate::environment::Environment;
use crate::manifest::{BinKind, ConfigError, Manifest};

/// One binary's validated build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixEntry {
    pub name: String,
    pub kind: BinKind,
    pub main: String,
    pub cgo: bool,
    /// Platform → architectures this binary ships for.
    pub distro: BTreeMap<Platform, Vec<Arch>>,
}

impl MatrixEntry {
    /// All `(platform, arch)` pairs of this entry, in canonical order.
    pub fn pairs(&self) -> Vec<(Platform, Arch)> {
        self.distro
            .iter()
            .flat_map(|(platform, archs)| archs.iter().map(|arch| (*platform, *arch)))
            .collect()
    }
}

/// The validated target matrix, keyed by binary name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Matrix {
    pub entries: BTreeMap<String, MatrixEntry>,
}

impl Matrix {
    /// Build and validate the matrix from the manifest's `[bins]` tables.
    ///
    /// Platform and architecture names are parsed into their typed forms and
    /// every declared pair is checked against the toolchain support table, so
    /// an unbuildable declaration fails here — before any compile starts.
    ///
    /// # Errors
    /// Returns an error if a platform/architecture name is unknown or a
    /// declared pair cannot be cross-compiled.
    pub fn from_manifest(manifest: &Manifest) -> Result<Matrix, ConfigError> {
        let mut entries = BTreeMap::new();
        for (name, bin) in &manifest.bins {
            let mut distro: BTreeMap<Platform, Vec<Arch>> = BTreeMap::new();
            for (platform_name, arch_names) in &bin.distro {
                let platform: Platform =
                    platform_name
                        .parse()
                        .map_err(|source| ConfigError::InvalidTarget {
                            bin: name.clone(),
                            source,
                        })?;
                let mut archs = Vec::new();
                for arch_name in arch_names {
                    let arch: Arch =
                        arch_name
                            .parse()
                            .map_err(|source| ConfigError::InvalidTarget {
                                bin: name.clone(),
                                source,
                            })?;
                    check_supported(platform, arch).map_err(|source| {
                        ConfigError::InvalidTarget {
                            bin: name.clone(),
                            source,
                        }
                    })?;
                    archs.push(arch);
                }
                distro.insert(platform, archs);
            }
            entries.insert(
                name.clone(),
                MatrixEntry {
                    name: name.clone(),
                    kind: bin.kind,
                    main: bin.main.clone(),
                    cgo: bin.cgo,
                    distro,
                },
            );
        }
        Ok(Matrix { entries })
    }

    /// Look up a single entry by binary name.
    ///
    /// # Errors
    /// Returns an error if no entry has that name.
    pub fn entry(&self, name: &str) -> Result<&MatrixEntry, ConfigError> {
        self.entries.get(name).ok_or_else(|| ConfigError::UnknownBin {
            name: name.to_owned(),
        })
    }
}

/// Apply environment narrowing to a declared matrix.
///
/// A pure transform, applied exactly once at startup: in `prod` the declared
/// distros pass through untouched; in every other environment each entry's
/// distro collapses to the single `host` pair so iteration builds stay fast.
pub fn resolve_matrix(declared: &Matrix, environment: Environment, host: (Platform, Arch)) -> Matrix {
    if environment.is_prod() {
        return declared.clone();
    }

    let (platform, arch) = host;
    let entries = declared
        .entries
        .iter()
        .map(|(name, entry)| {
            let mut narrowed = entry.clone();
            narrowed.distro = BTreeMap::from([(platform, vec![arch])]);
            (name.clone(), narrowed)
        })
        .collect();
    Matrix { entries }
}

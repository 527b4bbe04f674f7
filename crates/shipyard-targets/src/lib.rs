//! Host detection and build-target vocabulary for Shipyard.

use std::fmt;
use std::str::FromStr;

/// A distribution platform a binary can be built for.
///
/// `alpine` is a distinct platform name even though it compiles with
/// `GOOS=linux`: alpine artifacts are statically linked and published under
/// their own suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    Linux,
    Alpine,
    Darwin,
    Windows,
}

impl Platform {
    /// The `GOOS` value the Go toolchain expects for this platform.
    pub fn goos(self) -> &'static str {
        match self {
            Platform::Linux | Platform::Alpine => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
        }
    }

    /// All platforms, in canonical order.
    pub fn all() -> [Platform; 4] {
        [
            Platform::Linux,
            Platform::Alpine,
            Platform::Darwin,
            Platform::Windows,
        ]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Alpine => "alpine",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Platform::Linux),
            "alpine" => Ok(Platform::Alpine),
            "darwin" => Ok(Platform::Darwin),
            "windows" => Ok(Platform::Windows),
            other => Err(TargetError::UnknownPlatform {
                name: other.to_owned(),
            }),
        }
    }
}

/// A CPU architecture, named as the Go toolchain's `GOARCH` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// The `GOARCH` value for this architecture.
    pub fn goarch(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// All architectures, in canonical order.
    pub fn all() -> [Arch; 2] {
        [Arch::Amd64, Arch::Arm64]
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.goarch())
    }
}

impl FromStr for Arch {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amd64" => Ok(Arch::Amd64),
            "arm64" => Ok(Arch::Arm64),
            other => Err(TargetError::UnknownArch {
                name: other.to_owned(),
            }),
        }
    }
}

/// Whether the Go toolchain can cross-compile to `(platform, arch)` from any
/// build host.
pub fn supported(platform: Platform, arch: Arch) -> bool {
    match (platform, arch) {
        (Platform::Linux | Platform::Alpine | Platform::Darwin, _) => true,
        (Platform::Windows, Arch::Amd64) => true,
        (Platform::Windows, Arch::Arm64) => false,
    }
}

/// Validate that `(platform, arch)` is a buildable pair.
///
/// # Errors
/// Returns `TargetError::UnsupportedPair` when the toolchain cannot produce
/// a binary for the pair.
pub fn check_supported(platform: Platform, arch: Arch) -> Result<(), TargetError> {
    if supported(platform, arch) {
        Ok(())
    } else {
        Err(TargetError::UnsupportedPair { platform, arch })
    }
}

/// Detect the `(platform, arch)` pair of the build host.
///
/// Used to pick the single fast-iteration pair for non-production builds.
///
/// # Errors
/// Returns an error if the current OS/arch has no platform mapping.
pub fn host_pair() -> Result<(Platform, Arch), TargetError> {
    let pair = match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => (Platform::Linux, Arch::Amd64),
        ("linux", "aarch64") => (Platform::Linux, Arch::Arm64),
        ("macos", "x86_64") => (Platform::Darwin, Arch::Amd64),
        ("macos", "aarch64") => (Platform::Darwin, Arch::Arm64),
        ("windows", "x86_64") => (Platform::Windows, Arch::Amd64),
        (os, arch) => {
            return Err(TargetError::UnsupportedHost {
                os: os.to_owned(),
                arch: arch.to_owned(),
            })
        }
    };
    Ok(pair)
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("unsupported host: {os}/{arch} — no build platform maps to it")]
    UnsupportedHost { os: String, arch: String },

    #[error("unknown platform \"{name}\" — expected one of: linux, alpine, darwin, windows")]
    UnknownPlatform { name: String },

    #[error("unknown architecture \"{name}\" — expected one of: amd64, arm64")]
    UnknownArch { name: String },

    #[error("cannot cross-compile for {platform}/{arch}")]
    UnsupportedPair { platform: Platform, arch: Arch },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::{prop_oneof, proptest, Just, Strategy};

    use super::*;

    #[test]
    fn platform_display_parse_roundtrip() {
        for platform in Platform::all() {
            let parsed: Platform = platform.to_string().parse().unwrap();
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn arch_display_parse_roundtrip() {
        for arch in Arch::all() {
            let parsed: Arch = arch.to_string().parse().unwrap();
            assert_eq!(parsed, arch);
        }
    }

    #[test]
    fn alpine_compiles_as_linux() {
        assert_eq!(Platform::Alpine.goos(), "linux");
        assert_eq!(Platform::Linux.goos(), "linux");
    }

    #[test]
    fn unknown_platform_rejected() {
        let err = "freebsd".parse::<Platform>().unwrap_err();
        assert!(err.to_string().contains("freebsd"));
    }

    #[test]
    fn unknown_arch_rejected() {
        assert!("mips".parse::<Arch>().is_err());
    }

    #[test]
    fn windows_arm64_not_buildable() {
        assert!(!supported(Platform::Windows, Arch::Arm64));
        assert!(check_supported(Platform::Windows, Arch::Arm64).is_err());
    }

    #[test]
    fn linux_pairs_buildable() {
        for arch in Arch::all() {
            assert!(check_supported(Platform::Linux, arch).is_ok());
        }
    }

    #[test]
    fn host_pair_is_supported_when_detected() {
        if let Ok((platform, arch)) = host_pair() {
            assert!(supported(platform, arch));
        }
    }

    fn any_platform() -> impl Strategy<Value = Platform> {
        prop_oneof![
            Just(Platform::Linux),
            Just(Platform::Alpine),
            Just(Platform::Darwin),
            Just(Platform::Windows),
        ]
    }

    proptest! {
        #[test]
        fn display_never_contains_whitespace(platform in any_platform()) {
            let name = platform.to_string();
            assert!(!name.contains(char::is_whitespace));
            assert_eq!(name, name.to_lowercase());
        }
    }
}

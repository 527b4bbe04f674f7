//! Build environment selection.

use std::fmt;
use std::str::FromStr;

/// The environment a build runs for.
///
/// Only `prod` builds the full declared matrix; every other environment is
/// an iteration environment and builds a single host-compatible pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Qa,
    Prod,
}

/// The variable consulted when no `--env` override is given.
pub const ENV_VAR: &str = "SHIPYARD_ENV";

impl Environment {
    /// Read the environment from `SHIPYARD_ENV`, defaulting to `dev` when
    /// the variable is unset or unrecognized.
    pub fn from_env() -> Environment {
        std::env::var(ENV_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_prod(self) -> bool {
        self == Environment::Prod
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Environment::Dev),
            "qa" => Ok(Environment::Qa),
            "prod" => Ok(Environment::Prod),
            other => Err(UnknownEnvironment {
                name: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown environment \"{name}\" — expected one of: dev, qa, prod")]
pub struct UnknownEnvironment {
    pub name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_environments() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("qa".parse::<Environment>().unwrap(), Environment::Qa);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
    }

    #[test]
    fn parse_unknown_environment() {
        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn display_roundtrip() {
        for env in [Environment::Dev, Environment::Qa, Environment::Prod] {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
    }

    #[test]
    fn only_prod_is_prod() {
        assert!(Environment::Prod.is_prod());
        assert!(!Environment::Dev.is_prod());
        assert!(!Environment::Qa.is_prod());
    }
}

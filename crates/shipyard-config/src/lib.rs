//! Project configuration for Shipyard: the `shipyard.toml` manifest, the
//! build environment, and the effective target matrix.

pub mod environment;
pub mod manifest;
pub mod matrix;

pub use environment::Environment;
pub use manifest::{ConfigError, Manifest};
pub use matrix::{resolve_matrix, Matrix, MatrixEntry};

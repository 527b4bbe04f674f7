//! Go toolchain detection and invocation for Shipyard.

pub mod detect;
pub mod error;
pub mod invoke;

pub use detect::{detect_go, GoInfo};
pub use error::GotoolError;
pub use invoke::{GoBuildCommand, GoTestCommand, LdFlags};

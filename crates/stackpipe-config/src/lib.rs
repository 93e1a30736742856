//! Configuration for stackpipe.
//!
//! This crate handles:
//! - Resolving the required process environment inputs
//! - Parsing the optional KDL settings file (stackpipe.kdl)
//! - Placeholder substitution in build configuration files

pub mod error;
pub mod resolver;
pub mod settings;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use resolver::{resolve_from_env, resolve_with};
pub use settings::Settings;

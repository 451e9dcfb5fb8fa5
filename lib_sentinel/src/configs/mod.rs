//! # Configuration Modules
//!
//! Layered console configuration: built-in defaults, an optional JSON file,
//! then environment variables and command-line flags.

/// Console settings and the layer merge.
pub mod console_config;

pub use console_config::{default_token_path, load_config, ConfigError, ConsoleConfig};

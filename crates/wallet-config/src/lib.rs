//! Configuration for the `gm-wallet` toolkit.
//!
//! Configuration is read from a TOML (or JSON) file, `${VAR}` references are
//! substituted from the environment, `GM_WALLET_*` variables override
//! individual settings, and the result is validated before use.

use thiserror::Error;

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while expanding or decoding configuration text
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable reference contains forbidden characters
    #[error("invalid characters in environment variable name")]
    InvalidEnvChars,

    /// An environment variable reference was opened but never closed
    #[error("missing closing delimiter in environment variable reference")]
    MissingCloseDelim,

    /// A top-level configuration key is not a section table
    #[error("top-level config entry '{name}' is not a section")]
    SectionNotTable {
        /// Name of the offending key
        name: String,
    },
}

impl ConfigError {
    /// Create an Io error for the given path
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a SectionNotTable error
    pub fn section_not_table(name: impl Into<String>) -> Self {
        Self::SectionNotTable { name: name.into() }
    }
}

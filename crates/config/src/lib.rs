//! rill configuration
//!
//! Loading for the rill daemon's declarative plugin configuration: a TOML
//! file of flat sections, one per plugin instance, plus the reserved
//! `[rilld]` globals section. Before parsing, `%ENV[NAME]` tokens in the
//! raw text are replaced from the process environment.
//!
//! ```
//! use rill_config::{decode_sections, GlobalConfig};
//!
//! let sections = decode_sections("[LogfileInput]\npath = \"/var/log/app\"").unwrap();
//! assert_eq!(sections[0].0, "LogfileInput");
//! let globals = GlobalConfig::default();
//! assert_eq!(globals.pool_size, 100);
//! ```
//!
//! Section *values* stay as raw [`toml::Value`]s so the pipeline can check
//! them against a plugin's declared schema and hand schema-less plugins the
//! untouched key/value bag, with every value still carrying its originally
//! decoded type.

mod common;
mod env;
mod error;
mod global;
mod loader;

pub use common::{
    CommonFoConfig, CommonInputConfig, CommonSplitterConfig, QueueBufferConfig, RetryOptions,
    COMMON_KEYS, FILTER_OUTPUT_KEYS, INPUT_KEYS, SPLITTER_KEYS,
};
pub use env::{expand, expand_file};
pub use error::{ConfigError, Result};
pub use global::GlobalConfig;
pub use loader::{decode_sections, read_sections_file, Section, DAEMON_SECTION};

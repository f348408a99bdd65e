//! Sectioned configuration decoding
//!
//! A rill configuration file is a flat sequence of TOML tables. Every
//! top-level table is one *section*: the reserved `[rilld]` section carries
//! daemon-wide globals, and every other section describes one plugin
//! instance. Values inside a section are kept as raw [`toml::Value`]s so a
//! consumer holding a typed schema can deserialize them later without losing
//! the originally-decoded type.

use crate::error::{ConfigError, Result};

/// Name of the reserved daemon-globals section
pub const DAEMON_SECTION: &str = "rilld";

/// One decoded section: its name and its raw key/value entries
pub type Section = (String, toml::Table);

/// Decode expanded configuration text into named sections
///
/// Section order follows the file. Duplicate section names within one file
/// are a TOML parse error; callers merging several files are responsible for
/// detecting duplicates across them.
pub fn decode_sections(text: &str) -> Result<Vec<Section>> {
    let root: toml::Table = text.parse()?;

    let mut sections = Vec::with_capacity(root.len());
    for (name, value) in root {
        match value {
            toml::Value::Table(table) => sections.push((name, table)),
            _ => return Err(ConfigError::section_not_table(name)),
        }
    }
    Ok(sections)
}

/// Read, env-expand, and decode a configuration file
pub fn read_sections_file<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<Section>> {
    let contents = crate::env::expand_file(path)?;
    decode_sections(&contents)
}

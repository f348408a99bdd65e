//! Daemon-wide global settings
//!
//! Decoded from the reserved `[rilld]` section. All fields default so a
//! configuration with no `[rilld]` section at all is valid.

use serde::Deserialize;

/// Global settings that apply to the whole daemon
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Capacity of each of the two message-pack pools
    /// Default: 100
    pub pool_size: usize,

    /// Queue size for plugin channels (router input, runner inboxes)
    /// Default: 30
    pub plugin_chan_size: usize,

    /// Maximum number of times one message may be re-injected by filters
    /// Default: 4
    pub max_msg_loops: u32,

    /// Host name reported in generated messages
    /// Default: the OS host name
    pub hostname: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            pool_size: 100,
            plugin_chan_size: 30,
            max_msg_loops: 4,
            hostname: None,
        }
    }
}

impl GlobalConfig {
    /// The host name to stamp on generated messages
    ///
    /// Returns the configured override when present, otherwise the OS host
    /// name (falling back to "localhost" if that cannot be determined).
    pub fn effective_hostname(&self) -> String {
        if let Some(ref name) = self.hostname
            && !name.is_empty()
        {
            return name.clone();
        }
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.plugin_chan_size, 30);
        assert_eq!(config.max_msg_loops, 4);
        assert!(config.hostname.is_none());
    }

    #[test]
    fn test_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.pool_size, 100);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
pool_size = 250
max_msg_loops = 8
"#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.pool_size, 250);
        assert_eq!(config.max_msg_loops, 8);
        // Defaults still apply
        assert_eq!(config.plugin_chan_size, 30);
    }

    #[test]
    fn test_hostname_override() {
        let config: GlobalConfig = toml::from_str("hostname = \"edge-7\"").unwrap();
        assert_eq!(config.effective_hostname(), "edge-7");
    }

    #[test]
    fn test_hostname_defaults_to_os() {
        let config = GlobalConfig::default();
        assert!(!config.effective_hostname().is_empty());
    }
}

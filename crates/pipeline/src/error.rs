//! Pipeline error types

use rill_config::ConfigError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by plugin loading and the runtime helper operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration text could not be expanded or decoded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A section references a type name with no registered factory
    #[error("no registered plugin type '{name}'")]
    UnknownPluginType {
        /// The unresolvable type name
        name: String,
    },

    /// A type name does not end in a recognized category suffix
    #[error("plugin type '{type_name}' does not end in a recognized category")]
    UncategorizedPlugin {
        /// The offending type name
        type_name: String,
    },

    /// The same section name appeared twice across merged config files
    #[error("duplicate section '{name}'")]
    DuplicateSection {
        /// The repeated section name
        name: String,
    },

    /// A section contains a key the plugin's schema doesn't declare
    #[error("plugin '{plugin}' has no setting named '{option}'")]
    UnknownOption {
        /// Plugin instance name
        plugin: String,
        /// The unrecognized key
        option: String,
    },

    /// A common config field has the wrong type
    #[error("plugin '{plugin}' common settings: {message}")]
    TypeMismatch {
        /// Plugin instance name
        plugin: String,
        /// Deserializer message
        message: String,
    },

    /// Composite decoders form a dependency cycle
    #[error("circular dependency among composite decoders: {names}")]
    CyclicDependency {
        /// The names still unresolved when ordering stalled
        names: String,
    },

    /// A composite decoder names a sub-decoder that doesn't exist
    #[error("decoder '{decoder}' references unknown sub-decoder '{sub}'")]
    UnknownSubDecoder {
        /// The composite decoder
        decoder: String,
        /// The missing reference
        sub: String,
    },

    /// A plugin's own Init rejected its settings
    #[error("plugin '{plugin}' failed to initialize: {message}")]
    InitFailed {
        /// Plugin instance name
        plugin: String,
        /// The plugin's reason
        message: String,
    },

    /// A runner's Start returned an error
    #[error("runner '{name}' failed to start: {message}")]
    RunnerStartFailed {
        /// Runner name
        name: String,
        /// The start failure
        message: String,
    },

    /// A matcher spec could not be compiled
    #[error("invalid message matcher spec '{spec}'")]
    InvalidMatcher {
        /// The rejected spec text
        spec: String,
    },

    /// A message has been re-injected more times than allowed
    #[error("exceeded max message loop count of {max}")]
    LoopCountExceeded {
        /// The configured bound
        max: u32,
    },

    /// The process-wide abort signal fired while waiting
    #[error("aborted by shutdown")]
    Aborted,

    /// A directory lookup found no entry under the given name
    #[error("no plugin named '{name}'")]
    NotFound {
        /// The name looked up
        name: String,
    },

    /// A plugin exists but doesn't provide the requested capability
    #[error("plugin '{name}' does not provide {capability}")]
    WrongCapability {
        /// The plugin instance name
        name: String,
        /// The capability asked for
        capability: &'static str,
    },

    /// A maker operation ran before a successful PrepConfig
    #[error("plugin '{name}' config has not been prepped")]
    NotPrepared {
        /// Maker name
        name: String,
    },

    /// Aggregate load failure
    #[error("{count} errors loading plugins")]
    LoadHadErrors {
        /// Number of per-section errors recorded
        count: u32,
    },

    /// A plugin reported a runtime error
    #[error("plugin '{plugin}': {message}")]
    Plugin {
        /// Plugin instance name
        plugin: String,
        /// The plugin's reason
        message: String,
    },
}

impl PipelineError {
    /// Create a Plugin error
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

//! Process-wide plugin registry
//!
//! Maps plugin *type names* to factories. Plugin packages register their
//! types at startup, before any configuration is loaded; after that the map
//! is effectively read-only and lookups take the read side of the lock.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::builtins;
use crate::plugin::{PluginFactory, PluginInstance};

static AVAILABLE_PLUGINS: Lazy<RwLock<HashMap<String, PluginFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Make a plugin type available to configuration files
///
/// Registering the same name twice replaces the earlier factory; the last
/// registration wins.
pub fn register_plugin(name: impl Into<String>, factory: PluginFactory) {
    let name = name.into();
    if AVAILABLE_PLUGINS.write().insert(name.clone(), factory).is_some() {
        tracing::debug!(plugin = %name, "replaced registered plugin factory");
    }
}

/// Look up the factory for a type name
pub fn lookup_factory(name: &str) -> Option<PluginFactory> {
    AVAILABLE_PLUGINS.read().get(name).copied()
}

/// Whether a type name has a registered factory
pub fn is_registered(name: &str) -> bool {
    AVAILABLE_PLUGINS.read().contains_key(name)
}

/// Sorted list of every registered type name
pub fn registered_plugins() -> Vec<String> {
    let mut names: Vec<String> = AVAILABLE_PLUGINS.read().keys().cloned().collect();
    names.sort();
    names
}

/// Register every built-in plugin type
///
/// Idempotent; the daemon calls this once before loading configuration.
pub fn register_builtins() {
    register_plugin("ProtobufDecoder", || {
        PluginInstance::Decoder(Box::new(builtins::ProtobufDecoder::default()))
    });
    register_plugin("ProtobufEncoder", || {
        PluginInstance::Encoder(Box::new(builtins::ProtobufEncoder::default()))
    });
    register_plugin("MultiDecoder", || {
        PluginInstance::Decoder(Box::new(builtins::MultiDecoder::default()))
    });
    register_plugin("TokenSplitter", || {
        PluginInstance::Splitter(Box::new(builtins::TokenSplitter::default()))
    });
    register_plugin("PatternGroupingSplitter", || {
        PluginInstance::Splitter(Box::new(builtins::PatternGroupingSplitter::default()))
    });
    register_plugin("RillFramingSplitter", || {
        PluginInstance::Splitter(Box::new(builtins::RillFramingSplitter::default()))
    });
    register_plugin("NullSplitter", || {
        PluginInstance::Splitter(Box::new(builtins::NullSplitter::default()))
    });
}

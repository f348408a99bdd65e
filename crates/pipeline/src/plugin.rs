//! Plugin traits and categories
//!
//! Every pluggable component implements [`Plugin`] plus exactly one of the
//! six category traits. Factories produce a [`PluginInstance`], and the
//! category a configured instance belongs to is derived from the suffix of
//! its *type name* (`TcpInput` is an Input, `JsonDecoder` a Decoder, ...).
//!
//! Optional capabilities ([`StatAccumulator`], [`WantsName`],
//! [`WantsHelper`]) are separate traits reached through default-`None`
//! projection methods on the category traits, so call sites never downcast.

use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pack::PipelinePack;
use crate::runner::InputRunner;

/// Matches the category suffix of a plugin type name
static CATEGORY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new("(Decoder|Encoder|Filter|Input|Output|Splitter)$").unwrap());

/// The six plugin roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginCategory {
    Input,
    Decoder,
    Encoder,
    Filter,
    Output,
    Splitter,
}

impl PluginCategory {
    /// Category preparation order during load
    ///
    /// Decoders and encoders come first so they exist by the time inputs
    /// and outputs resolve them during their own initialization.
    pub const LOAD_ORDER: [PluginCategory; 6] = [
        PluginCategory::Decoder,
        PluginCategory::Encoder,
        PluginCategory::Splitter,
        PluginCategory::Input,
        PluginCategory::Filter,
        PluginCategory::Output,
    ];

    /// Derive a category from a plugin type name's suffix
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let suffix = CATEGORY_SUFFIX.captures(type_name)?.get(1)?.as_str();
        match suffix {
            "Input" => Some(Self::Input),
            "Decoder" => Some(Self::Decoder),
            "Encoder" => Some(Self::Encoder),
            "Filter" => Some(Self::Filter),
            "Output" => Some(Self::Output),
            "Splitter" => Some(Self::Splitter),
            _ => None,
        }
    }

    /// The category name as it appears in type-name suffixes
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Decoder => "Decoder",
            Self::Encoder => "Encoder",
            Self::Filter => "Filter",
            Self::Output => "Output",
            Self::Splitter => "Splitter",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior shared by every plugin
pub trait Plugin: Send + 'static {
    /// A default-populated table of the settings this plugin accepts
    ///
    /// When a schema is returned, section keys outside it are rejected and
    /// its values serve as defaults. Returning `None` opts out: the plugin
    /// receives the raw section as-is, every value still carrying its
    /// originally-decoded type.
    fn settings_schema(&self) -> Option<toml::Table> {
        None
    }

    /// Initialize from the merged settings table
    fn init(&mut self, settings: &toml::Table) -> Result<(), PipelineError>;
}

/// A source of messages
///
/// Inputs own their delivery loop: `run` is spawned as a task and drives
/// packs from the input pool into the router until `stop` is observed.
#[async_trait]
pub trait Input: Plugin + Sync {
    /// Run the input until stopped; spawned by the runner's start
    async fn run(
        &self,
        runner: Arc<InputRunner>,
        helper: Arc<PipelineConfig>,
    ) -> Result<(), PipelineError>;

    /// Ask the input to stop; must be safe to call while `run` executes
    fn stop(&self);

    /// Project to the stat-accumulator capability, when provided
    fn as_stat_accumulator(self: Arc<Self>) -> Option<Arc<dyn StatAccumulator>> {
        None
    }
}

/// Turns raw pack bytes into a populated message
pub trait Decoder: Plugin {
    /// Decode `pack.msg_bytes` into `pack.message`
    fn decode(&mut self, pack: &mut PipelinePack) -> Result<(), PipelineError>;

    /// Project to the helper-injection capability, when provided
    fn wants_helper(&mut self) -> Option<&mut dyn WantsHelper> {
        None
    }
}

/// Turns a message back into output bytes
pub trait Encoder: Plugin {
    /// Encode the pack's message; `None` skips the record
    fn encode(&mut self, pack: &PipelinePack) -> Result<Option<Vec<u8>>, PipelineError>;

    /// Project to the name-injection capability, when provided
    fn wants_name(&mut self) -> Option<&mut dyn WantsName> {
        None
    }
}

/// Consumes matched messages and may re-inject new ones
#[async_trait]
pub trait Filter: Plugin {
    /// Handle one matched pack
    async fn process_message(
        &mut self,
        pack: Arc<PipelinePack>,
        helper: &Arc<PipelineConfig>,
    ) -> Result<(), PipelineError>;

    /// Called on each tick when `ticker_interval` is configured
    async fn timer_event(&mut self, _helper: &Arc<PipelineConfig>) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Delivers matched messages to the outside world
#[async_trait]
pub trait Output: Plugin {
    /// Handle one matched pack
    async fn process_message(
        &mut self,
        pack: Arc<PipelinePack>,
        helper: &Arc<PipelineConfig>,
    ) -> Result<(), PipelineError>;

    /// Called on each tick when `ticker_interval` is configured
    async fn timer_event(&mut self, _helper: &Arc<PipelineConfig>) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Frames a byte stream into records
///
/// Splitters are stateful: a call may consume bytes without emitting a
/// record (garbage skipped while resynchronizing) or emit nothing until
/// more data arrives.
pub trait Splitter: Plugin {
    /// Inspect the front of `buf`
    ///
    /// Returns how many bytes to consume and, when a complete record was
    /// found, its range within the consumed bytes. `(0, None)` means more
    /// data is needed.
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>);
}

/// Capability: an input that aggregates externally submitted stats
pub trait StatAccumulator: Send + Sync {
    /// Record one stat sample
    fn add_stat(&self, name: &str, value: i64);
}

impl std::fmt::Debug for dyn StatAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StatAccumulator")
    }
}

/// Capability: a plugin that accepts its full instance name
pub trait WantsName {
    /// Assign the instance name chosen by the caller
    fn set_name(&mut self, name: &str);
}

/// Capability: a plugin that needs a handle back into the pipeline
pub trait WantsHelper {
    /// Inject a weak handle to the orchestrator
    fn set_helper(&mut self, helper: Weak<PipelineConfig>);
}

/// A freshly constructed, not-yet-initialized plugin of a known category
pub enum PluginInstance {
    Input(Box<dyn Input>),
    Decoder(Box<dyn Decoder>),
    Encoder(Box<dyn Encoder>),
    Filter(Box<dyn Filter>),
    Output(Box<dyn Output>),
    Splitter(Box<dyn Splitter>),
}

impl PluginInstance {
    /// The category this instance belongs to
    pub fn category(&self) -> PluginCategory {
        match self {
            Self::Input(_) => PluginCategory::Input,
            Self::Decoder(_) => PluginCategory::Decoder,
            Self::Encoder(_) => PluginCategory::Encoder,
            Self::Filter(_) => PluginCategory::Filter,
            Self::Output(_) => PluginCategory::Output,
            Self::Splitter(_) => PluginCategory::Splitter,
        }
    }

    /// View the instance through the base plugin trait
    pub fn plugin_mut(&mut self) -> &mut dyn Plugin {
        match self {
            Self::Input(p) => p.as_mut(),
            Self::Decoder(p) => p.as_mut(),
            Self::Encoder(p) => p.as_mut(),
            Self::Filter(p) => p.as_mut(),
            Self::Output(p) => p.as_mut(),
            Self::Splitter(p) => p.as_mut(),
        }
    }

    /// View the instance through the base plugin trait
    pub fn plugin(&self) -> &dyn Plugin {
        match self {
            Self::Input(p) => p.as_ref(),
            Self::Decoder(p) => p.as_ref(),
            Self::Encoder(p) => p.as_ref(),
            Self::Filter(p) => p.as_ref(),
            Self::Output(p) => p.as_ref(),
            Self::Splitter(p) => p.as_ref(),
        }
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PluginInstance")
            .field(&self.category())
            .finish()
    }
}

/// Produces a fresh, unconfigured plugin instance
pub type PluginFactory = fn() -> PluginInstance;

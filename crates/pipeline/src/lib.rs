//! rill - pipeline core
//!
//! Plugin loading, wiring, and lifecycle for the rill daemon.
//!
//! # Architecture
//!
//! ```text
//! [Inputs] ──packs──► [Router] ──matchers──► [Filters] ─┐
//!    │                   │                              │ re-inject
//!    ▼                   └─────────────► [Outputs]      ▼
//! [Splitters/Decoders]                              [inject pool]
//! ```
//!
//! A declarative TOML config names plugin instances; [`PipelineConfig`]
//! loads it in two phases (preload files sections into makers, load preps
//! them in fixed category order and builds runners), then serves as the
//! helper facade plugins use at runtime: pack allocation from two bounded
//! pools, directory lookups, and dynamic add/remove of runners against the
//! message router.
//!
//! # Key design
//!
//! - **Typed-at-use settings**: section values stay `toml::Value` so
//!   schema-less plugins get the raw bag while declared schemas are
//!   validated with defaults injected
//! - **Fixed prepare order**: Decoder → Encoder → Splitter → Input →
//!   Filter → Output, with composite decoders topologically ordered after
//!   their subs
//! - **Two pack pools**: input and inject supplies are separate bounded
//!   pools; collapsing them would deadlock filters against inputs
//! - **Error accumulation**: per-section load errors are logged and
//!   counted so one run surfaces every problem
//! - **Lock discipline**: each shared table has its own reader-writer
//!   lock, and none is held across a runner's `start` or any await

mod config;
mod deps;
mod error;
mod globals;
mod maker;
mod matcher;
mod pack;
mod plugin;
mod router;
mod runner;

pub mod builtins;
pub mod registry;

pub use config::{PipelineConfig, SharedEncoder};
pub use error::{PipelineError, Result};
pub use globals::Globals;
pub use maker::{CommonSettings, PluginMaker, MULTI_DECODER_TYPE};
pub use matcher::MessageMatcher;
pub use pack::{PackPool, PipelinePack};
pub use plugin::{
    Decoder, Encoder, Filter, Input, Output, Plugin, PluginCategory, PluginFactory,
    PluginInstance, Splitter, StatAccumulator, WantsHelper, WantsName,
};
pub use registry::{register_builtins, register_plugin};
pub use router::MessageRouter;
pub use runner::{
    DecoderRunner, FilterRunner, InputRunner, OutputRunner, PluginRunner, SplitterRunner,
};

// Re-export the carrier type plugins see on every pack
pub use rill_protocol::Message;

#[cfg(test)]
mod testsupport;

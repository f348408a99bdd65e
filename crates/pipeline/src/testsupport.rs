//! Test plugins
//!
//! Minimal implementations of each category used by the orchestrator tests.
//! Registered once per process; the registry is process-wide, so every test
//! shares these entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pack::PipelinePack;
use crate::plugin::{
    Decoder, Encoder, Filter, Input, Output, Plugin, PluginInstance, StatAccumulator, WantsName,
};
use crate::registry::{register_builtins, register_plugin};
use crate::runner::InputRunner;

/// Register the built-in and test plugin types, once per process
pub fn register_test_plugins() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        register_builtins();
        register_plugin("LogInput", || {
            PluginInstance::Input(Box::new(LogInput::default()))
        });
        register_plugin("StatInput", || {
            PluginInstance::Input(Box::new(StatInput::default()))
        });
        register_plugin("FussyInput", || {
            PluginInstance::Input(Box::new(FussyInput))
        });
        register_plugin("OddWidget", || {
            PluginInstance::Input(Box::new(LogInput::default()))
        });
        register_plugin("StubDecoder", || {
            PluginInstance::Decoder(Box::new(StubDecoder))
        });
        register_plugin("FailDecoder", || {
            PluginInstance::Decoder(Box::new(FailDecoder))
        });
        register_plugin("StrictDecoder", || {
            PluginInstance::Decoder(Box::new(StrictDecoder::default()))
        });
        register_plugin("StubFilter", || {
            PluginInstance::Filter(Box::new(StubFilter))
        });
        register_plugin("StubOutput", || {
            PluginInstance::Output(Box::new(StubOutput))
        });
        register_plugin("StubEncoder", || {
            PluginInstance::Encoder(Box::new(StubEncoder::default()))
        });
    });
}

/// An input that parks until stopped
#[derive(Default)]
pub struct LogInput {
    stopped: AtomicBool,
    notify: Notify,
}

impl Plugin for LogInput {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[async_trait]
impl Input for LogInput {
    async fn run(
        &self,
        _runner: Arc<InputRunner>,
        _helper: Arc<PipelineConfig>,
    ) -> Result<(), PipelineError> {
        while !self.stopped.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// An input that also accumulates stats
#[derive(Default)]
pub struct StatInput {
    stopped: AtomicBool,
    notify: Notify,
    stats: Mutex<Vec<(String, i64)>>,
}

impl Plugin for StatInput {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[async_trait]
impl Input for StatInput {
    async fn run(
        &self,
        _runner: Arc<InputRunner>,
        _helper: Arc<PipelineConfig>,
    ) -> Result<(), PipelineError> {
        while !self.stopped.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn as_stat_accumulator(self: Arc<Self>) -> Option<Arc<dyn StatAccumulator>> {
        Some(self)
    }
}

impl StatAccumulator for StatInput {
    fn add_stat(&self, name: &str, value: i64) {
        self.stats.lock().push((name.to_string(), value));
    }
}

/// An input whose init always fails
pub struct FussyInput;

impl Plugin for FussyInput {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Err(PipelineError::InitFailed {
            plugin: "FussyInput".to_string(),
            message: "always refuses".to_string(),
        })
    }
}

#[async_trait]
impl Input for FussyInput {
    async fn run(
        &self,
        _runner: Arc<InputRunner>,
        _helper: Arc<PipelineConfig>,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    fn stop(&self) {}
}

/// A decoder that stamps a fixed type on every pack
pub struct StubDecoder;

impl Plugin for StubDecoder {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Decoder for StubDecoder {
    fn decode(&mut self, pack: &mut PipelinePack) -> Result<(), PipelineError> {
        pack.message.msg_type = "stub".to_string();
        pack.message.payload = String::from_utf8_lossy(&pack.msg_bytes).into_owned();
        Ok(())
    }
}

/// A decoder that never matches
pub struct FailDecoder;

impl Plugin for FailDecoder {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Decoder for FailDecoder {
    fn decode(&mut self, _pack: &mut PipelinePack) -> Result<(), PipelineError> {
        Err(PipelineError::plugin("FailDecoder", "not my format"))
    }
}

/// A decoder with a declared settings schema
#[derive(Default)]
pub struct StrictDecoder {
    level: i64,
}

impl Plugin for StrictDecoder {
    fn settings_schema(&self) -> Option<toml::Table> {
        let mut table = toml::Table::new();
        table.insert("level".to_string(), toml::Value::Integer(3));
        Some(table)
    }

    fn init(&mut self, settings: &toml::Table) -> Result<(), PipelineError> {
        self.level = settings
            .get("level")
            .and_then(|v| v.as_integer())
            .unwrap_or(0);
        Ok(())
    }
}

impl Decoder for StrictDecoder {
    fn decode(&mut self, pack: &mut PipelinePack) -> Result<(), PipelineError> {
        pack.message.severity = self.level as i32;
        Ok(())
    }
}

/// A filter that releases every pack it sees
pub struct StubFilter;

impl Plugin for StubFilter {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[async_trait]
impl Filter for StubFilter {
    async fn process_message(
        &mut self,
        pack: Arc<PipelinePack>,
        _helper: &Arc<PipelineConfig>,
    ) -> Result<(), PipelineError> {
        PipelinePack::recycle_shared(pack);
        Ok(())
    }
}

/// An output that releases every pack it sees
pub struct StubOutput;

impl Plugin for StubOutput {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[async_trait]
impl Output for StubOutput {
    async fn process_message(
        &mut self,
        pack: Arc<PipelinePack>,
        _helper: &Arc<PipelineConfig>,
    ) -> Result<(), PipelineError> {
        PipelinePack::recycle_shared(pack);
        Ok(())
    }
}

/// An encoder that prefixes records with its assigned name
#[derive(Default)]
pub struct StubEncoder {
    name: String,
}

impl Plugin for StubEncoder {
    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Encoder for StubEncoder {
    fn encode(&mut self, pack: &PipelinePack) -> Result<Option<Vec<u8>>, PipelineError> {
        Ok(Some(
            format!("{}|{}", self.name, pack.message.payload).into_bytes(),
        ))
    }

    fn wants_name(&mut self) -> Option<&mut dyn WantsName> {
        Some(self)
    }
}

impl WantsName for StubEncoder {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

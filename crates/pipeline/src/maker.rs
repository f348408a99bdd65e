//! Plugin makers
//!
//! A [`PluginMaker`] is the not-yet-live recipe built from one config
//! section: it resolves the factory, derives the category from the type
//! name, validates the section against the plugin's schema, and can then
//! produce configured plugin instances and runners.

use parking_lot::Mutex;
use rill_config::{
    CommonFoConfig, CommonInputConfig, CommonSplitterConfig, FILTER_OUTPUT_KEYS, INPUT_KEYS,
    SPLITTER_KEYS,
};

use crate::error::PipelineError;
use crate::plugin::{PluginCategory, PluginFactory, PluginInstance};
use crate::registry;
use crate::runner::{
    DecoderRunner, FilterRunner, InputRunner, OutputRunner, PluginRunner, SplitterRunner,
};

/// The type name filed under the transient composite-decoder pseudo-category
pub const MULTI_DECODER_TYPE: &str = "MultiDecoder";

/// Parsed category-common settings for one section
#[derive(Debug, Clone, Default)]
pub enum CommonSettings {
    /// Categories with no common settings beyond `type`
    #[default]
    Basic,
    Input(CommonInputConfig),
    FilterOutput(CommonFoConfig),
    Splitter(CommonSplitterConfig),
}

impl CommonSettings {
    /// The input-category settings, when this section is an Input
    pub fn input(&self) -> Option<&CommonInputConfig> {
        match self {
            Self::Input(c) => Some(c),
            _ => None,
        }
    }

    /// The filter/output-category settings, when this section is one
    pub fn filter_output(&self) -> Option<&CommonFoConfig> {
        match self {
            Self::FilterOutput(c) => Some(c),
            _ => None,
        }
    }

    /// The splitter-category settings, when this section is a Splitter
    pub fn splitter(&self) -> Option<&CommonSplitterConfig> {
        match self {
            Self::Splitter(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Default)]
struct MakerState {
    /// The instance built at construction, configured by prep, and consumed
    /// by the first runner
    prototype: Option<PluginInstance>,
    /// Frozen plugin-side settings after a successful prep
    settings: Option<toml::Table>,
    /// Parsed category-common settings after a successful prep
    common: CommonSettings,
    /// Whether prep has run (successfully or not)
    prepped: bool,
    /// Failure message from a prior prep, replayed on repeat calls
    prep_err: Option<String>,
}

/// Recipe for producing configured plugins and runners from one section
pub struct PluginMaker {
    name: String,
    type_name: String,
    category: PluginCategory,
    section: toml::Table,
    factory: PluginFactory,
    state: Mutex<MakerState>,
}

impl PluginMaker {
    /// Build a maker from a section
    ///
    /// The type name is the section's `type` value, defaulting to the
    /// section name itself. The factory must already be registered and the
    /// type name must carry a recognized category suffix.
    pub fn new(name: &str, section: toml::Table) -> Result<Self, PipelineError> {
        let type_name = section
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or(name)
            .to_string();

        let factory = registry::lookup_factory(&type_name).ok_or_else(|| {
            PipelineError::UnknownPluginType {
                name: type_name.clone(),
            }
        })?;

        let prototype = factory();

        let category = PluginCategory::from_type_name(&type_name).ok_or_else(|| {
            PipelineError::UncategorizedPlugin {
                type_name: type_name.clone(),
            }
        })?;
        if prototype.category() != category {
            // The factory disagrees with what the type name promises.
            return Err(PipelineError::UncategorizedPlugin { type_name });
        }

        Ok(Self {
            name: name.to_string(),
            type_name,
            category,
            section,
            factory,
            state: Mutex::new(MakerState {
                prototype: Some(prototype),
                ..Default::default()
            }),
        })
    }

    /// The configured instance name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin type name
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The category derived from the type name
    #[inline]
    pub fn category(&self) -> PluginCategory {
        self.category
    }

    /// The raw section this maker was built from
    #[inline]
    pub fn section(&self) -> &toml::Table {
        &self.section
    }

    /// The `subs` list of a composite decoder section
    pub fn subs(&self) -> Vec<String> {
        self.section
            .get("subs")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The parsed category-common settings; default until prep succeeds
    pub fn common(&self) -> CommonSettings {
        self.state.lock().common.clone()
    }

    /// Validate the section and initialize the prototype
    ///
    /// Idempotent: a repeat call is a no-op that replays the first outcome.
    pub fn prep_config(&self) -> Result<(), PipelineError> {
        let mut state = self.state.lock();
        if state.prepped {
            return match &state.prep_err {
                None => Ok(()),
                Some(message) => Err(PipelineError::InitFailed {
                    plugin: self.name.clone(),
                    message: message.clone(),
                }),
            };
        }

        let result = self.prep(&mut state);
        state.prepped = true;
        if let Err(ref e) = result {
            state.prep_err = Some(e.to_string());
        }
        result
    }

    fn prep(&self, state: &mut MakerState) -> Result<(), PipelineError> {
        let (common_table, plugin_table) = self.partition_section();

        let common = self.parse_common(common_table)?;

        let prototype = state
            .prototype
            .as_mut()
            .ok_or_else(|| PipelineError::NotPrepared {
                name: self.name.clone(),
            })?;

        let settings = match prototype.plugin().settings_schema() {
            Some(mut schema) => {
                for (key, value) in plugin_table {
                    if !schema.contains_key(&key) {
                        return Err(PipelineError::UnknownOption {
                            plugin: self.name.clone(),
                            option: key,
                        });
                    }
                    schema.insert(key, value);
                }
                schema
            }
            None => plugin_table,
        };

        prototype
            .plugin_mut()
            .init(&settings)
            .map_err(|e| self.init_error(e))?;

        state.settings = Some(settings);
        state.common = common;
        Ok(())
    }

    /// Split the raw section into core-owned and plugin-owned keys
    fn partition_section(&self) -> (toml::Table, toml::Table) {
        let keys: &[&str] = match self.category {
            PluginCategory::Input => INPUT_KEYS,
            PluginCategory::Filter | PluginCategory::Output => FILTER_OUTPUT_KEYS,
            PluginCategory::Splitter => SPLITTER_KEYS,
            PluginCategory::Decoder | PluginCategory::Encoder => &[],
        };

        let mut common = toml::Table::new();
        let mut plugin = toml::Table::new();
        for (key, value) in &self.section {
            if key == "type" {
                continue;
            }
            if keys.contains(&key.as_str()) {
                common.insert(key.clone(), value.clone());
            } else {
                plugin.insert(key.clone(), value.clone());
            }
        }
        (common, plugin)
    }

    fn parse_common(&self, table: toml::Table) -> Result<CommonSettings, PipelineError> {
        let value = toml::Value::Table(table);
        let mismatch = |e: toml::de::Error| PipelineError::TypeMismatch {
            plugin: self.name.clone(),
            message: e.to_string(),
        };
        Ok(match self.category {
            PluginCategory::Input => CommonSettings::Input(value.try_into().map_err(mismatch)?),
            PluginCategory::Filter | PluginCategory::Output => {
                CommonSettings::FilterOutput(value.try_into().map_err(mismatch)?)
            }
            PluginCategory::Splitter => {
                CommonSettings::Splitter(value.try_into().map_err(mismatch)?)
            }
            PluginCategory::Decoder | PluginCategory::Encoder => CommonSettings::Basic,
        })
    }

    fn init_error(&self, e: PipelineError) -> PipelineError {
        match e {
            already @ PipelineError::InitFailed { .. } => already,
            other => PipelineError::InitFailed {
                plugin: self.name.clone(),
                message: other.to_string(),
            },
        }
    }

    fn ensure_prepped(&self) -> Result<(), PipelineError> {
        let state = self.state.lock();
        if !state.prepped || state.prep_err.is_some() {
            return Err(PipelineError::NotPrepared {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Produce a fresh, configured plugin instance
    ///
    /// Requires a prior successful [`prep_config`](Self::prep_config).
    pub fn make(&self) -> Result<PluginInstance, PipelineError> {
        self.ensure_prepped()?;
        let settings = self.state.lock().settings.clone().unwrap_or_default();

        let mut instance = (self.factory)();
        instance
            .plugin_mut()
            .init(&settings)
            .map_err(|e| self.init_error(e))?;
        Ok(instance)
    }

    /// Wrap a configured plugin in its category's runner, unstarted
    ///
    /// The runner takes `full_name`, defaulting to the maker's own name
    /// when empty. Decoder makers produce a fresh instance per call; for
    /// every other category the prepped prototype is consumed, so this can
    /// run at most once. Encoders never take runners.
    pub fn make_runner(
        &self,
        full_name: &str,
        chan_size: usize,
    ) -> Result<PluginRunner, PipelineError> {
        self.ensure_prepped()?;
        let name = if full_name.is_empty() {
            self.name.clone()
        } else {
            full_name.to_string()
        };

        if self.category == PluginCategory::Encoder {
            return Err(PipelineError::plugin(
                &self.name,
                "encoder plugins do not take runners",
            ));
        }

        if self.category == PluginCategory::Decoder {
            let PluginInstance::Decoder(decoder) = self.make()? else {
                return Err(PipelineError::plugin(&self.name, "factory kind changed"));
            };
            return Ok(PluginRunner::Decoder(std::sync::Arc::new(
                DecoderRunner::new(name, decoder, chan_size),
            )));
        }

        let (prototype, common) = {
            let mut state = self.state.lock();
            let prototype =
                state
                    .prototype
                    .take()
                    .ok_or_else(|| PipelineError::RunnerStartFailed {
                        name: name.clone(),
                        message: "runner was already made from this config".to_string(),
                    })?;
            (prototype, state.common.clone())
        };

        let runner = match prototype {
            PluginInstance::Input(input) => {
                let common = common.input().cloned().unwrap_or_default();
                PluginRunner::Input(std::sync::Arc::new(InputRunner::new(
                    name,
                    std::sync::Arc::from(input),
                    common,
                )))
            }
            PluginInstance::Filter(filter) => {
                let common = common.filter_output().cloned().unwrap_or_default();
                PluginRunner::Filter(std::sync::Arc::new(FilterRunner::new(
                    name, filter, &common, chan_size,
                )?))
            }
            PluginInstance::Output(output) => {
                let common = common.filter_output().cloned().unwrap_or_default();
                PluginRunner::Output(std::sync::Arc::new(OutputRunner::new(
                    name, output, &common, chan_size,
                )?))
            }
            PluginInstance::Splitter(splitter) => {
                let common = common.splitter().cloned().unwrap_or_default();
                PluginRunner::Splitter(SplitterRunner::new(name, splitter, common))
            }
            other => {
                return Err(PipelineError::plugin(
                    &self.name,
                    format!("unexpected {} instance from factory", other.category()),
                ));
            }
        };
        Ok(runner)
    }
}

impl std::fmt::Debug for PluginMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginMaker")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("category", &self.category)
            .finish()
    }
}

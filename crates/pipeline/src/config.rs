//! The pipeline orchestrator
//!
//! `PipelineConfig` owns the whole plugin graph: it loads configuration in
//! two phases, keeps the maker and runner tables, hands out packs from the
//! two pools, and mediates dynamic add/remove of runners against the
//! router. It is also the helper facade plugins see at runtime.
//!
//! # Load phases
//!
//! **Preload** decodes one config file into makers, filed by category.
//! It may run several times to merge files, but only serially. **Load**
//! then preps every maker in fixed category order (Decoder → Encoder →
//! Splitter → Input → Filter → Output) and builds the runners. Per-section
//! errors are logged and counted rather than aborting, so one run surfaces
//! every problem; a non-zero count fails the load at the end. Nothing is
//! started until `start_runners`.
//!
//! # Concurrency
//!
//! The two load phases are single-threaded entry points. After load, every
//! helper operation is safe from any thread: each shared table sits behind
//! its own reader-writer lock, and no lock is ever held across a runner's
//! `start` or any await point.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rill_config::{GlobalConfig, DAEMON_SECTION};
use tokio_util::task::TaskTracker;

use crate::deps::{order_multi_decoders, MultiDecoderNode};
use crate::error::PipelineError;
use crate::globals::Globals;
use crate::maker::{PluginMaker, MULTI_DECODER_TYPE};
use crate::pack::{PackPool, PipelinePack};
use crate::plugin::{
    Decoder, Encoder, PluginCategory, PluginInstance, StatAccumulator,
};
use crate::router::MessageRouter;
use crate::runner::{
    DecoderRunner, FilterRunner, InputRunner, OutputRunner, PluginRunner, SplitterRunner,
};

/// Plugin instances registered automatically when no explicit section
/// configures them
const DEFAULT_PLUGINS: [&str; 6] = [
    "ProtobufDecoder",
    "ProtobufEncoder",
    "TokenSplitter",
    "PatternGroupingSplitter",
    "RillFramingSplitter",
    "NullSplitter",
];

/// A shared, lockable encoder instance
pub type SharedEncoder = Arc<Mutex<Box<dyn Encoder>>>;

/// Transient state used only while configuration is loading
#[derive(Default)]
struct LoadState {
    /// Makers filed by category, in config order
    makers_by_category: HashMap<PluginCategory, Vec<Arc<PluginMaker>>>,
    /// Composite decoders, held aside until the orderer runs
    multi_decoders: Vec<Arc<PluginMaker>>,
    /// Every section name seen across merged preloads
    seen_sections: HashSet<String>,
    /// Which default plugins an explicit section already configured
    defaults_configured: HashMap<&'static str, bool>,
    /// Per-section errors recorded so far
    errcnt: u32,
    /// Names in the order each category was prepped
    load_order: HashMap<PluginCategory, Vec<String>>,
}

/// Master object encapsulating the entire pipeline configuration
pub struct PipelineConfig {
    globals: Arc<Globals>,
    router: Arc<MessageRouter>,

    /// Pack supply for inputs
    input_pool: PackPool,
    /// Pack supply for filter re-injection; separate to prevent deadlock
    inject_pool: PackPool,

    /// Live makers by category and name
    makers: RwLock<HashMap<PluginCategory, HashMap<String, Arc<PluginMaker>>>>,

    input_runners: RwLock<HashMap<String, Arc<InputRunner>>>,
    filter_runners: RwLock<HashMap<String, Arc<FilterRunner>>>,
    output_runners: RwLock<HashMap<String, Arc<OutputRunner>>>,

    /// Every running decoder runner
    all_decoders: RwLock<Vec<Arc<DecoderRunner>>>,
    /// Every instantiated encoder, by full name
    all_encoders: RwLock<HashMap<String, SharedEncoder>>,

    /// Messages recorded by load-phase and helper errors
    log_msgs: Mutex<Vec<String>>,

    inputs_tracker: TaskTracker,
    filters_tracker: TaskTracker,
    decoders_tracker: TaskTracker,

    load: Mutex<LoadState>,
}

impl PipelineConfig {
    /// Create an orchestrator; `None` uses default global settings
    pub fn new(globals: Option<GlobalConfig>) -> Self {
        let globals = Arc::new(Globals::new(globals.unwrap_or_default()));
        let pool_size = globals.config().pool_size;
        let chan_size = globals.config().plugin_chan_size;
        let router = Arc::new(MessageRouter::new(chan_size, globals.abort_token()));

        let mut makers = HashMap::new();
        for category in PluginCategory::LOAD_ORDER {
            makers.insert(category, HashMap::new());
        }

        Self {
            globals,
            router,
            input_pool: PackPool::new(pool_size),
            inject_pool: PackPool::new(pool_size),
            makers: RwLock::new(makers),
            input_runners: RwLock::new(HashMap::new()),
            filter_runners: RwLock::new(HashMap::new()),
            output_runners: RwLock::new(HashMap::new()),
            all_decoders: RwLock::new(Vec::new()),
            all_encoders: RwLock::new(HashMap::new()),
            log_msgs: Mutex::new(Vec::new()),
            inputs_tracker: TaskTracker::new(),
            filters_tracker: TaskTracker::new(),
            decoders_tracker: TaskTracker::new(),
            load: Mutex::new(LoadState::default()),
        }
    }

    // ------------------------------------------------------------------
    // Phase 1: preload
    // ------------------------------------------------------------------

    /// Read, expand, and decode a config file into makers
    ///
    /// May be called several times to merge files. Not reentrant: preload
    /// and load are serial, single-threaded entry points.
    pub fn preload_from_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let contents = rill_config::expand_file(path)?;
        self.preload_from_str(&contents)
    }

    /// Decode already-expanded config text into makers
    pub fn preload_from_str(&self, text: &str) -> Result<(), PipelineError> {
        let sections = rill_config::decode_sections(text)?;

        let mut state = self.load.lock();
        if state.defaults_configured.is_empty() {
            for name in DEFAULT_PLUGINS {
                state.defaults_configured.insert(name, false);
            }
        }

        for (name, section) in sections {
            if name == DAEMON_SECTION {
                continue;
            }
            if !state.seen_sections.insert(name.clone()) {
                let err = PipelineError::DuplicateSection { name };
                self.log_load_error(&mut state, err.to_string());
                continue;
            }
            if let Some(configured) = state.defaults_configured.get_mut(name.as_str()) {
                *configured = true;
            }

            tracing::info!(section = %name, "pre-loading plugin section");
            match PluginMaker::new(&name, section) {
                Ok(maker) => {
                    let maker = Arc::new(maker);
                    if maker.type_name() == MULTI_DECODER_TYPE {
                        // Composites are filed aside so they can be prepped
                        // after every possible sub-decoder.
                        state.multi_decoders.push(maker);
                    } else {
                        let category = maker.category();
                        state
                            .makers_by_category
                            .entry(category)
                            .or_default()
                            .push(maker);
                    }
                }
                Err(e) => self.log_load_error(&mut state, e.to_string()),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 2: load
    // ------------------------------------------------------------------

    /// Prep every maker and build the runner tables
    ///
    /// Call once, after preloading every file. Succeeds only when no
    /// per-section error was recorded; runners are left unstarted either
    /// way.
    pub fn load_config(&self) -> Result<(), PipelineError> {
        let mut state_guard = self.load.lock();
        let state = &mut *state_guard;

        if state.makers_by_category.is_empty() && state.multi_decoders.is_empty() {
            self.log_load_error(state, "Empty configuration".to_string());
            return Err(PipelineError::LoadHadErrors {
                count: state.errcnt,
            });
        }

        self.file_default_makers(state);
        self.order_composite_decoders(state)?;

        let chan_size = self.globals.config().plugin_chan_size;
        for category in PluginCategory::LOAD_ORDER {
            let makers: Vec<Arc<PluginMaker>> = state
                .makers_by_category
                .get(&category)
                .cloned()
                .unwrap_or_default();

            for maker in makers {
                tracing::info!(plugin = %maker.name(), category = %category, "loading plugin");
                let prepped = match maker.prep_config() {
                    Ok(()) => true,
                    Err(e) => {
                        self.log_load_error(state, e.to_string());
                        false
                    }
                };
                self.makers
                    .write()
                    .entry(category)
                    .or_default()
                    .insert(maker.name().to_string(), maker.clone());
                state
                    .load_order
                    .entry(category)
                    .or_default()
                    .push(maker.name().to_string());

                if category == PluginCategory::Encoder {
                    if prepped {
                        self.load_encoder(state, &maker);
                    }
                    continue;
                }
                if !prepped {
                    // The prep failure was already logged and counted once.
                    continue;
                }

                match maker.make_runner("", chan_size) {
                    Ok(PluginRunner::Input(runner)) => {
                        self.input_runners
                            .write()
                            .insert(maker.name().to_string(), runner);
                    }
                    Ok(PluginRunner::Filter(runner)) => {
                        self.filter_runners
                            .write()
                            .insert(maker.name().to_string(), runner);
                    }
                    Ok(PluginRunner::Output(runner)) => {
                        self.output_runners
                            .write()
                            .insert(maker.name().to_string(), runner);
                    }
                    // Decoder and splitter runners are built on demand at
                    // runtime; constructing one here just proves the path.
                    Ok(PluginRunner::Decoder(_)) | Ok(PluginRunner::Splitter(_)) => {}
                    Err(e) => {
                        let msg = format!("Error making runner for {}: {}", maker.name(), e);
                        self.log_load_error(state, msg);
                    }
                }
            }
        }

        if state.errcnt != 0 {
            return Err(PipelineError::LoadHadErrors {
                count: state.errcnt,
            });
        }
        Ok(())
    }

    /// File makers for default plugins no explicit section configured
    ///
    /// The list is computed up front and the makers flow through the same
    /// category lists as ordinary sections.
    fn file_default_makers(&self, state: &mut LoadState) {
        for name in DEFAULT_PLUGINS {
            if state
                .defaults_configured
                .get(name)
                .copied()
                .unwrap_or(false)
            {
                continue;
            }
            state.defaults_configured.insert(name, true);
            tracing::info!(section = %name, "pre-loading default plugin");
            match PluginMaker::new(name, toml::Table::new()) {
                Ok(maker) => {
                    let maker = Arc::new(maker);
                    state
                        .makers_by_category
                        .entry(maker.category())
                        .or_default()
                        .push(maker);
                }
                Err(e) => self.log_load_error(state, e.to_string()),
            }
        }
    }

    /// Order composite decoders after their subs and append them to the
    /// tail of the Decoder list
    fn order_composite_decoders(&self, state: &mut LoadState) -> Result<(), PipelineError> {
        if state.multi_decoders.is_empty() {
            return Ok(());
        }

        let known: HashSet<String> = state
            .makers_by_category
            .get(&PluginCategory::Decoder)
            .map(|makers| makers.iter().map(|m| m.name().to_string()).collect())
            .unwrap_or_default();

        let nodes: Vec<MultiDecoderNode> = state
            .multi_decoders
            .iter()
            .map(|m| MultiDecoderNode::new(m.name(), m.subs()))
            .collect();
        let ordered = order_multi_decoders(nodes, &known)?;

        let mut by_name: HashMap<String, Arc<PluginMaker>> = state
            .multi_decoders
            .drain(..)
            .map(|m| (m.name().to_string(), m))
            .collect();
        let decoders = state
            .makers_by_category
            .entry(PluginCategory::Decoder)
            .or_default();
        for node in ordered {
            if let Some(maker) = by_name.remove(&node.name) {
                decoders.push(maker);
            }
        }
        Ok(())
    }

    /// Instantiate a just-prepped encoder into the encoder table
    fn load_encoder(&self, state: &mut LoadState, maker: &Arc<PluginMaker>) {
        match maker.make() {
            Ok(PluginInstance::Encoder(mut encoder)) => {
                if let Some(wants) = encoder.wants_name() {
                    wants.set_name(maker.name());
                }
                self.all_encoders
                    .write()
                    .insert(maker.name().to_string(), Arc::new(Mutex::new(encoder)));
            }
            Ok(_) => {}
            Err(e) => self.log_load_error(state, e.to_string()),
        }
    }

    /// Record a load-phase error, de-duplicating identical messages
    fn log_load_error(&self, state: &mut LoadState, msg: String) {
        let mut msgs = self.log_msgs.lock();
        if msgs.iter().any(|m| *m == msg) {
            return;
        }
        tracing::error!("{msg}");
        msgs.push(msg);
        state.errcnt += 1;
    }

    /// Record a runtime helper error
    fn log(&self, msg: String) {
        tracing::error!("{msg}");
        self.log_msgs.lock().push(msg);
    }

    // ------------------------------------------------------------------
    // Runtime helper operations
    // ------------------------------------------------------------------

    /// Take a pack from the inject pool for (re-)injection
    ///
    /// `msg_loop_count` is the loop count of the message the caller is
    /// holding, or zero. Fails when the message has looped too many times
    /// or the abort signal fires while waiting for a free pack.
    pub async fn pipeline_pack(&self, msg_loop_count: u32) -> Result<PipelinePack, PipelineError> {
        let loop_count = msg_loop_count + 1;
        let max = self.globals.config().max_msg_loops;
        if loop_count > max {
            return Err(PipelineError::LoopCountExceeded { max });
        }

        let abort = self.globals.abort_token();
        let mut pack = self.inject_pool.take(&abort).await?;
        pack.message.set_uuid_v4();
        pack.message.set_timestamp_now();
        pack.message.hostname = self.globals.hostname().to_string();
        pack.message.pid = self.globals.pid() as i32;
        pack.msg_loop_count = loop_count;
        Ok(pack)
    }

    /// The singleton router handle
    #[inline]
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// The pack pool feeding inputs
    #[inline]
    pub fn input_recycle_chan(&self) -> &PackPool {
        &self.input_pool
    }

    /// The pack pool feeding filter re-injection
    #[inline]
    pub fn inject_recycle_chan(&self) -> &PackPool {
        &self.inject_pool
    }

    /// The daemon's shared globals
    #[inline]
    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    /// Host name stamped on generated messages
    #[inline]
    pub fn hostname(&self) -> &str {
        self.globals.hostname()
    }

    /// Look up a running input runner
    pub fn input(&self, name: &str) -> Option<Arc<InputRunner>> {
        self.input_runners.read().get(name).cloned()
    }

    /// Look up a running filter runner
    pub fn filter(&self, name: &str) -> Option<Arc<FilterRunner>> {
        self.filter_runners.read().get(name).cloned()
    }

    /// Look up a running output runner
    pub fn output(&self, name: &str) -> Option<Arc<OutputRunner>> {
        self.output_runners.read().get(name).cloned()
    }

    /// Instantiate a fresh encoder from the cached maker
    ///
    /// The instance is recorded under `full` and handed its full name when
    /// it accepts one. A later call with the same full name replaces the
    /// earlier instance.
    pub fn encoder(&self, base: &str, full: &str) -> Option<SharedEncoder> {
        let maker = {
            let makers = self.makers.read();
            makers
                .get(&PluginCategory::Encoder)
                .and_then(|table| table.get(base))
                .cloned()
        }?;

        match maker.make() {
            Ok(PluginInstance::Encoder(mut encoder)) => {
                if let Some(wants) = encoder.wants_name() {
                    wants.set_name(full);
                }
                let shared: SharedEncoder = Arc::new(Mutex::new(encoder));
                let replaced = self
                    .all_encoders
                    .write()
                    .insert(full.to_string(), shared.clone());
                if replaced.is_some() {
                    tracing::warn!(encoder = %full, "replaced an existing encoder instance");
                }
                Some(shared)
            }
            Ok(_) => None,
            Err(e) => {
                self.log(format!("Error creating encoder '{full}': {e}"));
                None
            }
        }
    }

    /// Whether a decoder maker exists under the given name
    pub fn has_decoder(&self, name: &str) -> bool {
        self.makers
            .read()
            .get(&PluginCategory::Decoder)
            .is_some_and(|table| table.contains_key(name))
    }

    /// Instantiate a fresh bare decoder, no runner
    pub fn decoder(self: &Arc<Self>, name: &str) -> Option<Box<dyn Decoder>> {
        let maker = {
            let makers = self.makers.read();
            makers
                .get(&PluginCategory::Decoder)
                .and_then(|table| table.get(name))
                .cloned()
        }?;

        match maker.make() {
            Ok(PluginInstance::Decoder(mut decoder)) => {
                if let Some(wants) = decoder.wants_helper() {
                    wants.set_helper(Arc::downgrade(self));
                }
                Some(decoder)
            }
            Ok(_) => None,
            Err(e) => {
                self.log(format!("Error creating decoder '{name}': {e}"));
                None
            }
        }
    }

    /// Instantiate, register, and start a decoder runner
    pub fn decoder_runner(
        self: &Arc<Self>,
        base: &str,
        full: &str,
    ) -> Option<Arc<DecoderRunner>> {
        let maker = {
            let makers = self.makers.read();
            makers
                .get(&PluginCategory::Decoder)
                .and_then(|table| table.get(base))
                .cloned()
        }?;

        let chan_size = self.globals.config().plugin_chan_size;
        let runner = match maker.make_runner(full, chan_size) {
            Ok(PluginRunner::Decoder(runner)) => runner,
            Ok(_) => return None,
            Err(e) => {
                self.log(format!("Error creating decoder runner '{full}': {e}"));
                return None;
            }
        };

        runner.inject_helper(self);
        self.all_decoders.write().push(runner.clone());
        runner.start(self);
        Some(runner)
    }

    /// Stop and unregister a decoder runner
    ///
    /// Returns whether the runner was registered. Shutdown is signaled by
    /// closing the runner's inbound channel.
    pub fn stop_decoder_runner(&self, runner: &Arc<DecoderRunner>) -> bool {
        let found = {
            let mut all = self.all_decoders.write();
            match all.iter().position(|r| Arc::ptr_eq(r, runner)) {
                Some(idx) => {
                    all.remove(idx);
                    true
                }
                None => false,
            }
        };
        if found {
            runner.close_in_chan();
        }
        found
    }

    /// Project a named input to its stat-accumulator capability
    pub fn stat_accumulator(&self, name: &str) -> Result<Arc<dyn StatAccumulator>, PipelineError> {
        let runner = self
            .input_runners
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound {
                name: name.to_string(),
            })?;
        runner.input().clone().as_stat_accumulator().ok_or_else(|| {
            PipelineError::WrongCapability {
                name: name.to_string(),
                capability: "StatAccumulator",
            }
        })
    }

    /// Build a fresh splitter runner from a named splitter maker
    pub fn splitter_runner(&self, name: &str) -> Result<SplitterRunner, PipelineError> {
        let maker = {
            let makers = self.makers.read();
            makers
                .get(&PluginCategory::Splitter)
                .and_then(|table| table.get(name))
                .cloned()
        }
        .ok_or_else(|| PipelineError::NotFound {
            name: name.to_string(),
        })?;

        match maker.make()? {
            PluginInstance::Splitter(splitter) => Ok(SplitterRunner::new(
                name.to_string(),
                splitter,
                maker.common().splitter().cloned().unwrap_or_default(),
            )),
            _ => Err(PipelineError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Start a filter runner and register it with the router
    ///
    /// The runner is inserted before `start` so it is visible under its
    /// name immediately; the insertion is rolled back when `start` fails.
    /// No lock is held across the `start` call.
    pub async fn add_filter_runner(
        self: &Arc<Self>,
        runner: Arc<FilterRunner>,
    ) -> Result<(), PipelineError> {
        let name = runner.name().to_string();
        self.filter_runners
            .write()
            .insert(name.clone(), runner.clone());

        if let Err(e) = runner.start(self) {
            self.filter_runners.write().remove(&name);
            return Err(e);
        }

        if let Some(entry) = runner.matcher_entry() {
            let _ = self.router.add_filter_chan().send(entry).await;
        }
        Ok(())
    }

    /// Remove a filter runner while the system is live
    ///
    /// A no-op returning false once shutdown has begun, to avoid racing
    /// router teardown. The router's removal of the matcher closes the
    /// filter's inbound channel, which tells it to stop.
    pub async fn remove_filter_runner(&self, name: &str) -> bool {
        if self.globals.is_shutting_down() {
            return false;
        }

        if self.filter_runners.write().remove(name).is_none() {
            return false;
        }
        let _ = self
            .router
            .remove_filter_chan()
            .send(name.to_string())
            .await;
        true
    }

    /// Start an input runner and add it to the running set
    pub fn add_input_runner(
        self: &Arc<Self>,
        runner: Arc<InputRunner>,
    ) -> Result<(), PipelineError> {
        let name = runner.name().to_string();
        self.input_runners
            .write()
            .insert(name.clone(), runner.clone());

        if let Err(e) = runner.start(self) {
            self.input_runners.write().remove(&name);
            return Err(e);
        }
        Ok(())
    }

    /// Unregister an input runner and stop its plugin
    ///
    /// The maker is removed first so the name can't be re-resolved while
    /// the input winds down.
    pub fn remove_input_runner(&self, runner: &Arc<InputRunner>) {
        let name = runner.name();
        if let Some(table) = self.makers.write().get_mut(&PluginCategory::Input) {
            table.remove(name);
        }
        self.input_runners.write().remove(name);
        runner.input().stop();
    }

    /// Unregister an output runner and its matcher
    pub async fn remove_output_runner(&self, runner: &Arc<OutputRunner>) {
        let name = runner.name().to_string();
        let had_maker = self
            .makers
            .write()
            .get_mut(&PluginCategory::Output)
            .and_then(|table| table.remove(&name))
            .is_some();
        if had_maker {
            let _ = self.router.remove_output_chan().send(name.clone()).await;
        }
        self.output_runners.write().remove(&name);
    }

    // ------------------------------------------------------------------
    // Startup and shutdown support for the host binary
    // ------------------------------------------------------------------

    /// Start the loaded system: outputs, filters, the router, then inputs
    ///
    /// Matchers are registered directly with the unstarted router so the
    /// very first routed pack already sees them.
    pub fn start_runners(self: &Arc<Self>) -> Result<(), PipelineError> {
        let outputs: Vec<Arc<OutputRunner>> =
            self.output_runners.read().values().cloned().collect();
        for runner in outputs {
            runner.start(self)?;
            if let Some(entry) = runner.matcher_entry() {
                self.router.register_output_matcher(entry);
            }
        }

        let filters: Vec<Arc<FilterRunner>> =
            self.filter_runners.read().values().cloned().collect();
        for runner in filters {
            runner.start(self)?;
            if let Some(entry) = runner.matcher_entry() {
                self.router.register_filter_matcher(entry);
            }
        }

        self.router.start();

        let inputs: Vec<Arc<InputRunner>> = self.input_runners.read().values().cloned().collect();
        for runner in inputs {
            runner.start(self)?;
        }
        Ok(())
    }

    /// Ask every running input to stop
    pub fn stop_inputs(&self) {
        for runner in self.input_runners.read().values() {
            runner.input().stop();
        }
    }

    /// Close every decoder runner's inbound channel
    pub fn stop_decoders(&self) {
        let drained: Vec<Arc<DecoderRunner>> = self.all_decoders.write().drain(..).collect();
        for runner in drained {
            runner.close_in_chan();
        }
    }

    /// Wait-group tracking input runner tasks
    #[inline]
    pub fn inputs_tracker(&self) -> &TaskTracker {
        &self.inputs_tracker
    }

    /// Wait-group tracking filter runner tasks
    #[inline]
    pub fn filters_tracker(&self) -> &TaskTracker {
        &self.filters_tracker
    }

    /// Wait-group tracking decoder runner tasks
    #[inline]
    pub fn decoders_tracker(&self) -> &TaskTracker {
        &self.decoders_tracker
    }

    /// Messages recorded by load-phase and helper errors
    pub fn log_msgs(&self) -> Vec<String> {
        self.log_msgs.lock().clone()
    }

    /// Names in the order the given category was prepped
    pub fn load_order(&self, category: PluginCategory) -> Vec<String> {
        self.load
            .lock()
            .load_order
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("inputs", &self.input_runners.read().len())
            .field("filters", &self.filter_runners.read().len())
            .field("outputs", &self.output_runners.read().len())
            .field("decoders", &self.all_decoders.read().len())
            .field("encoders", &self.all_encoders.read().len())
            .finish()
    }
}

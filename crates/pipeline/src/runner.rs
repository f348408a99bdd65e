//! Runner variants
//!
//! A runner is the live wrapper binding one configured plugin to the
//! router's I/O. Inputs, filters, and outputs run as tasks; decoder runners
//! run as tasks fed through an inbound pack channel; splitter runners are
//! passive framers owned by the input they're attached to.
//!
//! Runners are created unstarted. `start` never runs under any orchestrator
//! lock: the orchestrator inserts a runner into its table, releases the
//! lock, starts it, and rolls the insertion back on failure.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use crossfire::{MAsyncRx, MAsyncTx};
use parking_lot::Mutex;
use rill_config::{CommonFoConfig, CommonInputConfig, CommonSplitterConfig};
use tokio_util::sync::CancellationToken;

use crate::config::{PipelineConfig, SharedEncoder};
use crate::error::PipelineError;
use crate::matcher::MessageMatcher;
use crate::pack::PipelinePack;
use crate::plugin::{Decoder, Filter, Input, Output, Splitter};
use crate::router::MatcherEntry;

/// A runner of any category, as produced by a maker
pub enum PluginRunner {
    Input(Arc<InputRunner>),
    Decoder(Arc<DecoderRunner>),
    Filter(Arc<FilterRunner>),
    Output(Arc<OutputRunner>),
    Splitter(SplitterRunner),
}

impl std::fmt::Debug for PluginRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            PluginRunner::Input(_) => "Input",
            PluginRunner::Decoder(_) => "Decoder",
            PluginRunner::Filter(_) => "Filter",
            PluginRunner::Output(_) => "Output",
            PluginRunner::Splitter(_) => "Splitter",
        };
        write!(f, "PluginRunner::{variant}")
    }
}

/// Build the optional ticker driving a plugin's timer events
fn make_ticker(interval_secs: u32) -> Option<tokio::time::Interval> {
    if interval_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(u64::from(interval_secs));
    Some(tokio::time::interval_at(
        tokio::time::Instant::now() + period,
        period,
    ))
}

/// Await the next tick, or forever when no ticker is configured
async fn next_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker.as_mut() {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Live wrapper around an input plugin
pub struct InputRunner {
    name: String,
    input: Arc<dyn Input>,
    config: CommonInputConfig,
    splitter_runner: Mutex<Option<SplitterRunner>>,
}

impl InputRunner {
    pub(crate) fn new(name: String, input: Arc<dyn Input>, config: CommonInputConfig) -> Self {
        Self {
            name,
            input,
            config,
            splitter_runner: Mutex::new(None),
        }
    }

    /// The runner's instance name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped input plugin
    #[inline]
    pub fn input(&self) -> &Arc<dyn Input> {
        &self.input
    }

    /// Name of the decoder this input feeds, when configured
    pub fn decoder_name(&self) -> Option<&str> {
        self.config.decoder.as_deref()
    }

    /// Whether decoding should run inline with the input
    pub fn synchronous_decode(&self) -> bool {
        self.config.synchronous_decode.unwrap_or(false)
    }

    /// Seconds between the input's timer events; 0 disables
    pub fn ticker_interval(&self) -> u32 {
        self.config.ticker_interval
    }

    /// Detach the splitter runner resolved at start, if any
    pub fn take_splitter_runner(&self) -> Option<SplitterRunner> {
        self.splitter_runner.lock().take()
    }

    /// Resolve configured collaborators and spawn the input's run loop
    pub(crate) fn start(self: &Arc<Self>, cx: &Arc<PipelineConfig>) -> Result<(), PipelineError> {
        if let Some(splitter_name) = self.config.splitter.as_deref() {
            let sr = cx.splitter_runner(splitter_name).map_err(|e| {
                PipelineError::RunnerStartFailed {
                    name: self.name.clone(),
                    message: e.to_string(),
                }
            })?;
            *self.splitter_runner.lock() = Some(sr);
        }

        if let Some(decoder_name) = self.config.decoder.as_deref()
            && !cx.has_decoder(decoder_name)
        {
            return Err(PipelineError::RunnerStartFailed {
                name: self.name.clone(),
                message: format!("no registered decoder '{decoder_name}'"),
            });
        }

        let input = self.input.clone();
        let runner = self.clone();
        let helper = cx.clone();
        cx.inputs_tracker().spawn(async move {
            tracing::debug!(input = %runner.name, "input runner starting");
            if let Err(e) = input.run(runner.clone(), helper).await {
                tracing::error!(input = %runner.name, error = %e, "input exited with error");
            }
            tracing::debug!(input = %runner.name, "input runner stopped");
        });
        Ok(())
    }
}

/// Live wrapper around a decoder plugin, fed through an inbound channel
pub struct DecoderRunner {
    name: String,
    decoder: Mutex<Option<Box<dyn Decoder>>>,
    in_tx: Mutex<Option<MAsyncTx<PipelinePack>>>,
    in_rx: Mutex<Option<MAsyncRx<PipelinePack>>>,
    shutdown: CancellationToken,
}

impl DecoderRunner {
    pub(crate) fn new(name: String, decoder: Box<dyn Decoder>, chan_size: usize) -> Self {
        let (in_tx, in_rx) = crossfire::mpmc::bounded_async(chan_size.max(1));
        Self {
            name,
            decoder: Mutex::new(Some(decoder)),
            in_tx: Mutex::new(Some(in_tx)),
            in_rx: Mutex::new(Some(in_rx)),
            shutdown: CancellationToken::new(),
        }
    }

    /// The runner's full instance name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sender for packs awaiting decoding; `None` once shut down
    pub fn in_chan(&self) -> Option<MAsyncTx<PipelinePack>> {
        self.in_tx.lock().clone()
    }

    /// Signal shutdown by dropping the inbound sender
    pub(crate) fn close_in_chan(&self) -> bool {
        let had = self.in_tx.lock().take().is_some();
        self.shutdown.cancel();
        had
    }

    /// Give the wrapped decoder a handle back into the pipeline
    pub(crate) fn inject_helper(&self, cx: &Arc<PipelineConfig>) {
        if let Some(decoder) = self.decoder.lock().as_mut()
            && let Some(wants) = decoder.wants_helper()
        {
            wants.set_helper(Arc::downgrade(cx));
        }
    }

    /// Spawn the decode loop on the decoders wait-group
    pub(crate) fn start(self: &Arc<Self>, cx: &Arc<PipelineConfig>) {
        let Some(rx) = self.in_rx.lock().take() else {
            return;
        };
        let Some(mut decoder) = self.decoder.lock().take() else {
            return;
        };

        let runner = self.clone();
        let helper = cx.clone();
        cx.decoders_tracker().spawn(async move {
            let router_in = helper.router().in_chan();
            loop {
                tokio::select! {
                    _ = runner.shutdown.cancelled() => break,
                    res = rx.recv() => {
                        let Ok(mut pack) = res else { break };
                        match decoder.decode(&mut pack) {
                            Ok(()) => {
                                let _ = router_in.send(pack).await;
                            }
                            Err(e) => {
                                tracing::warn!(decoder = %runner.name, error = %e, "decode failed");
                                pack.recycle();
                            }
                        }
                    }
                }
            }
            tracing::debug!(decoder = %runner.name, "decoder runner stopped");
        });
    }
}

/// Live wrapper around a filter plugin
pub struct FilterRunner {
    name: String,
    filter: Mutex<Option<Box<dyn Filter>>>,
    matcher: MessageMatcher,
    signer: Option<String>,
    ticker_interval: u32,
    can_exit: bool,
    in_tx: Mutex<Option<MAsyncTx<Arc<PipelinePack>>>>,
    in_rx: Mutex<Option<MAsyncRx<Arc<PipelinePack>>>>,
}

impl FilterRunner {
    pub(crate) fn new(
        name: String,
        filter: Box<dyn Filter>,
        common: &CommonFoConfig,
        chan_size: usize,
    ) -> Result<Self, PipelineError> {
        // Filters receive nothing without a matcher, so an absent spec is a
        // config error rather than a silent no-op.
        if common.message_matcher.trim().is_empty() {
            return Err(PipelineError::InvalidMatcher {
                spec: common.message_matcher.clone(),
            });
        }
        let matcher = MessageMatcher::parse(&common.message_matcher)?;
        let (in_tx, in_rx) = crossfire::mpmc::bounded_async(chan_size.max(1));
        Ok(Self {
            name,
            filter: Mutex::new(Some(filter)),
            matcher,
            signer: common.message_signer.clone(),
            ticker_interval: common.ticker_interval,
            can_exit: common.can_exit.unwrap_or(false),
            in_tx: Mutex::new(Some(in_tx)),
            in_rx: Mutex::new(Some(in_rx)),
        })
    }

    /// The runner's instance name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled matcher spec
    #[inline]
    pub fn matcher(&self) -> &MessageMatcher {
        &self.matcher
    }

    /// Whether the daemon tolerates this filter exiting
    #[inline]
    pub fn can_exit(&self) -> bool {
        self.can_exit
    }

    /// Detach the matcher registration handed to the router
    ///
    /// The entry owns the only inbound sender: when the router drops it,
    /// the filter's channel closes and its run loop ends.
    pub(crate) fn matcher_entry(&self) -> Option<MatcherEntry> {
        self.in_tx.lock().take().map(|tx| MatcherEntry {
            name: self.name.clone(),
            matcher: self.matcher.clone(),
            signer: self.signer.clone(),
            tx,
        })
    }

    /// Spawn the filter's run loop on the filters wait-group
    pub(crate) fn start(self: &Arc<Self>, cx: &Arc<PipelineConfig>) -> Result<(), PipelineError> {
        let Some(rx) = self.in_rx.lock().take() else {
            return Err(PipelineError::RunnerStartFailed {
                name: self.name.clone(),
                message: "runner already started".to_string(),
            });
        };
        let Some(mut filter) = self.filter.lock().take() else {
            return Err(PipelineError::RunnerStartFailed {
                name: self.name.clone(),
                message: "runner already started".to_string(),
            });
        };

        let runner = self.clone();
        let helper = cx.clone();
        cx.filters_tracker().spawn(async move {
            let mut ticker = make_ticker(runner.ticker_interval);
            loop {
                tokio::select! {
                    res = rx.recv() => {
                        let Ok(pack) = res else { break };
                        if let Err(e) = filter.process_message(pack, &helper).await {
                            tracing::warn!(filter = %runner.name, error = %e, "filter failed on message");
                        }
                    }
                    _ = next_tick(&mut ticker) => {
                        if let Err(e) = filter.timer_event(&helper).await {
                            tracing::warn!(filter = %runner.name, error = %e, "filter timer event failed");
                        }
                    }
                }
            }
            tracing::debug!(filter = %runner.name, "filter runner stopped");
        });
        Ok(())
    }
}

/// Live wrapper around an output plugin
pub struct OutputRunner {
    name: String,
    output: Mutex<Option<Box<dyn Output>>>,
    matcher: MessageMatcher,
    signer: Option<String>,
    ticker_interval: u32,
    encoder_name: Option<String>,
    use_framing: bool,
    encoder: Mutex<Option<SharedEncoder>>,
    in_tx: Mutex<Option<MAsyncTx<Arc<PipelinePack>>>>,
    in_rx: Mutex<Option<MAsyncRx<Arc<PipelinePack>>>>,
}

impl OutputRunner {
    pub(crate) fn new(
        name: String,
        output: Box<dyn Output>,
        common: &CommonFoConfig,
        chan_size: usize,
    ) -> Result<Self, PipelineError> {
        if common.message_matcher.trim().is_empty() {
            return Err(PipelineError::InvalidMatcher {
                spec: common.message_matcher.clone(),
            });
        }
        let matcher = MessageMatcher::parse(&common.message_matcher)?;
        let (in_tx, in_rx) = crossfire::mpmc::bounded_async(chan_size.max(1));
        Ok(Self {
            name,
            output: Mutex::new(Some(output)),
            matcher,
            signer: common.message_signer.clone(),
            ticker_interval: common.ticker_interval,
            encoder_name: common.encoder.clone(),
            use_framing: common.use_framing.unwrap_or(false),
            encoder: Mutex::new(None),
            in_tx: Mutex::new(Some(in_tx)),
            in_rx: Mutex::new(Some(in_rx)),
        })
    }

    /// The runner's instance name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled matcher spec
    #[inline]
    pub fn matcher(&self) -> &MessageMatcher {
        &self.matcher
    }

    /// Whether encoded records should carry the native stream framing
    #[inline]
    pub fn use_framing(&self) -> bool {
        self.use_framing
    }

    /// The encoder instance resolved at start, when one is configured
    pub fn encoder(&self) -> Option<SharedEncoder> {
        self.encoder.lock().clone()
    }

    /// Detach the matcher registration handed to the router
    pub(crate) fn matcher_entry(&self) -> Option<MatcherEntry> {
        self.in_tx.lock().take().map(|tx| MatcherEntry {
            name: self.name.clone(),
            matcher: self.matcher.clone(),
            signer: self.signer.clone(),
            tx,
        })
    }

    /// Resolve the configured encoder and spawn the output's run loop
    pub(crate) fn start(self: &Arc<Self>, cx: &Arc<PipelineConfig>) -> Result<(), PipelineError> {
        if let Some(base) = self.encoder_name.as_deref() {
            let encoder =
                cx.encoder(base, &self.name)
                    .ok_or_else(|| PipelineError::RunnerStartFailed {
                        name: self.name.clone(),
                        message: format!("no registered encoder '{base}'"),
                    })?;
            *self.encoder.lock() = Some(encoder);
        }

        let Some(rx) = self.in_rx.lock().take() else {
            return Err(PipelineError::RunnerStartFailed {
                name: self.name.clone(),
                message: "runner already started".to_string(),
            });
        };
        let Some(mut output) = self.output.lock().take() else {
            return Err(PipelineError::RunnerStartFailed {
                name: self.name.clone(),
                message: "runner already started".to_string(),
            });
        };

        let runner = self.clone();
        let helper = cx.clone();
        tokio::spawn(async move {
            let mut ticker = make_ticker(runner.ticker_interval);
            loop {
                tokio::select! {
                    res = rx.recv() => {
                        let Ok(pack) = res else { break };
                        if let Err(e) = output.process_message(pack, &helper).await {
                            tracing::warn!(output = %runner.name, error = %e, "output failed on message");
                        }
                    }
                    _ = next_tick(&mut ticker) => {
                        if let Err(e) = output.timer_event(&helper).await {
                            tracing::warn!(output = %runner.name, error = %e, "output timer event failed");
                        }
                    }
                }
            }
            tracing::debug!(output = %runner.name, "output runner stopped");
        });
        Ok(())
    }
}

/// Stateful byte-stream framer attached to an input
///
/// Not a task: the owning input pushes chunks in and takes complete records
/// out. A carry-over buffer holds the bytes of any record still in flight.
pub struct SplitterRunner {
    name: String,
    splitter: Box<dyn Splitter>,
    config: CommonSplitterConfig,
    buf: BytesMut,
}

impl SplitterRunner {
    pub(crate) fn new(
        name: String,
        splitter: Box<dyn Splitter>,
        config: CommonSplitterConfig,
    ) -> Self {
        let buf = BytesMut::with_capacity(config.min_buffer_size.max(1024) as usize);
        Self {
            name,
            splitter,
            config,
            buf,
        }
    }

    /// The runner's instance name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether truncated records are delivered rather than dropped
    pub fn keep_truncated(&self) -> bool {
        self.config.keep_truncated.unwrap_or(false)
    }

    /// Whether consumers receive raw record bytes
    pub fn use_message_bytes(&self) -> bool {
        self.config.use_message_bytes.unwrap_or(false)
    }

    /// Feed a chunk of stream data, returning every completed record
    pub fn split(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        loop {
            let (consumed, record) = self.splitter.find_record(&self.buf);
            if consumed == 0 {
                break;
            }
            let taken = self.buf.split_to(consumed);
            if let Some(range) = record {
                records.push(taken[range].to_vec());
            }
        }
        records
    }

    /// Flush the carry-over buffer at end of stream
    ///
    /// Returns the trailing incomplete record when the configuration asks
    /// for it, otherwise discards it.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let remainder = self.buf.split();
        if remainder.is_empty() || !self.config.deliver_incomplete_final.unwrap_or(false) {
            return None;
        }
        Some(remainder.to_vec())
    }
}

impl std::fmt::Debug for SplitterRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitterRunner")
            .field("name", &self.name)
            .field("buffered", &self.buf.len())
            .finish()
    }
}

//! Message router registration surface
//!
//! The router owns the matcher tables that decide which filters and outputs
//! see each message. The pipeline core interacts with it two ways:
//!
//! - at startup, runners register their matchers directly before the router
//!   task runs;
//! - while the system is live, dynamic add/remove goes through bounded
//!   channels serviced by the router task, so mutators may block briefly.
//!
//! Removing a matcher drops the only sender for its consumer's inbound
//! channel, which is how a removed filter learns it should stop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossfire::{MAsyncRx, MAsyncTx};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::matcher::MessageMatcher;
use crate::pack::PipelinePack;

/// A matcher registration: the predicate plus the consumer's inbound sender
pub(crate) struct MatcherEntry {
    pub name: String,
    pub matcher: MessageMatcher,
    pub signer: Option<String>,
    pub tx: MAsyncTx<Arc<PipelinePack>>,
}

impl MatcherEntry {
    fn matches(&self, pack: &PipelinePack) -> bool {
        if !self.matcher.matches(&pack.message) {
            return false;
        }
        match &self.signer {
            None => true,
            Some(signer) => pack.signer.as_deref() == Some(signer.as_str()),
        }
    }
}

/// The central message router
pub struct MessageRouter {
    in_tx: MAsyncTx<PipelinePack>,
    in_rx: Mutex<Option<MAsyncRx<PipelinePack>>>,

    add_filter_tx: MAsyncTx<MatcherEntry>,
    add_filter_rx: Mutex<Option<MAsyncRx<MatcherEntry>>>,
    remove_filter_tx: MAsyncTx<String>,
    remove_filter_rx: Mutex<Option<MAsyncRx<String>>>,

    add_output_tx: MAsyncTx<MatcherEntry>,
    add_output_rx: Mutex<Option<MAsyncRx<MatcherEntry>>>,
    remove_output_tx: MAsyncTx<String>,
    remove_output_rx: Mutex<Option<MAsyncRx<String>>>,

    filter_matchers: RwLock<Vec<MatcherEntry>>,
    output_matchers: RwLock<Vec<MatcherEntry>>,

    abort: CancellationToken,
    processed: AtomicU64,
    matchers_added: AtomicU64,
    matchers_removed: AtomicU64,
}

impl MessageRouter {
    /// Create an unstarted router
    pub fn new(chan_size: usize, abort: CancellationToken) -> Self {
        let (in_tx, in_rx) = crossfire::mpmc::bounded_async(chan_size.max(1));
        let (add_filter_tx, add_filter_rx) = crossfire::mpmc::bounded_async(1);
        let (remove_filter_tx, remove_filter_rx) = crossfire::mpmc::bounded_async(1);
        let (add_output_tx, add_output_rx) = crossfire::mpmc::bounded_async(1);
        let (remove_output_tx, remove_output_rx) = crossfire::mpmc::bounded_async(1);
        Self {
            in_tx,
            in_rx: Mutex::new(Some(in_rx)),
            add_filter_tx,
            add_filter_rx: Mutex::new(Some(add_filter_rx)),
            remove_filter_tx,
            remove_filter_rx: Mutex::new(Some(remove_filter_rx)),
            add_output_tx,
            add_output_rx: Mutex::new(Some(add_output_rx)),
            remove_output_tx,
            remove_output_rx: Mutex::new(Some(remove_output_rx)),
            filter_matchers: RwLock::new(Vec::new()),
            output_matchers: RwLock::new(Vec::new()),
            abort,
            processed: AtomicU64::new(0),
            matchers_added: AtomicU64::new(0),
            matchers_removed: AtomicU64::new(0),
        }
    }

    /// Sender feeding packs into the router
    pub fn in_chan(&self) -> MAsyncTx<PipelinePack> {
        self.in_tx.clone()
    }

    /// Channel for adding a filter matcher while the system is live
    pub(crate) fn add_filter_chan(&self) -> MAsyncTx<MatcherEntry> {
        self.add_filter_tx.clone()
    }

    /// Channel for removing a filter matcher by name
    pub(crate) fn remove_filter_chan(&self) -> MAsyncTx<String> {
        self.remove_filter_tx.clone()
    }

    /// Channel for adding an output matcher while the system is live
    pub(crate) fn add_output_chan(&self) -> MAsyncTx<MatcherEntry> {
        self.add_output_tx.clone()
    }

    /// Channel for removing an output matcher by name
    pub(crate) fn remove_output_chan(&self) -> MAsyncTx<String> {
        self.remove_output_tx.clone()
    }

    /// Register a filter matcher directly; startup only
    pub(crate) fn register_filter_matcher(&self, entry: MatcherEntry) {
        self.filter_matchers.write().push(entry);
    }

    /// Register an output matcher directly; startup only
    pub(crate) fn register_output_matcher(&self, entry: MatcherEntry) {
        self.output_matchers.write().push(entry);
    }

    /// Number of filter matchers currently registered
    pub fn filter_matcher_count(&self) -> usize {
        self.filter_matchers.read().len()
    }

    /// Number of output matchers currently registered
    pub fn output_matcher_count(&self) -> usize {
        self.output_matchers.read().len()
    }

    /// Dynamic matcher additions serviced so far
    pub fn matchers_added(&self) -> u64 {
        self.matchers_added.load(Ordering::Relaxed)
    }

    /// Dynamic matcher removals serviced so far
    pub fn matchers_removed(&self) -> u64 {
        self.matchers_removed.load(Ordering::Relaxed)
    }

    /// Packs routed so far
    pub fn messages_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Spawn the router task; a second call is a no-op
    pub fn start(self: &Arc<Self>) {
        let Some(in_rx) = self.in_rx.lock().take() else {
            return;
        };
        let add_filter_rx = self.add_filter_rx.lock().take().expect("router channels");
        let remove_filter_rx = self.remove_filter_rx.lock().take().expect("router channels");
        let add_output_rx = self.add_output_rx.lock().take().expect("router channels");
        let remove_output_rx = self.remove_output_rx.lock().take().expect("router channels");

        let router = self.clone();
        tokio::spawn(async move {
            tracing::info!(
                filters = router.filter_matcher_count(),
                outputs = router.output_matcher_count(),
                "message router starting"
            );
            loop {
                tokio::select! {
                    _ = router.abort.cancelled() => break,
                    res = add_filter_rx.recv() => {
                        let Ok(entry) = res else { break };
                        router.filter_matchers.write().push(entry);
                        router.matchers_added.fetch_add(1, Ordering::Relaxed);
                    }
                    res = remove_filter_rx.recv() => {
                        let Ok(name) = res else { break };
                        router.remove_matcher(&router.filter_matchers, &name);
                    }
                    res = add_output_rx.recv() => {
                        let Ok(entry) = res else { break };
                        router.output_matchers.write().push(entry);
                        router.matchers_added.fetch_add(1, Ordering::Relaxed);
                    }
                    res = remove_output_rx.recv() => {
                        let Ok(name) = res else { break };
                        router.remove_matcher(&router.output_matchers, &name);
                    }
                    res = in_rx.recv() => {
                        let Ok(pack) = res else { break };
                        router.dispatch(pack).await;
                    }
                }
            }
            // Dropping the matcher entries closes every consumer's inbound
            // channel, which is the stop signal for filters and outputs.
            router.filter_matchers.write().clear();
            router.output_matchers.write().clear();
            tracing::info!(
                processed = router.messages_processed(),
                "message router stopped"
            );
        });
    }

    fn remove_matcher(&self, table: &RwLock<Vec<MatcherEntry>>, name: &str) {
        let mut matchers = table.write();
        let before = matchers.len();
        matchers.retain(|entry| entry.name != name);
        if matchers.len() != before {
            self.matchers_removed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fan one pack out to every matching consumer
    async fn dispatch(&self, mut pack: PipelinePack) {
        self.processed.fetch_add(1, Ordering::Relaxed);

        let targets: Vec<MAsyncTx<Arc<PipelinePack>>> = {
            let filters = self.filter_matchers.read();
            let outputs = self.output_matchers.read();
            filters
                .iter()
                .chain(outputs.iter())
                .filter(|entry| entry.matches(&pack))
                .map(|entry| entry.tx.clone())
                .collect()
        };

        if targets.is_empty() {
            pack.recycle();
            return;
        }

        pack.set_ref_count(targets.len() as u32);
        let shared = Arc::new(pack);
        for tx in targets {
            if tx.send(shared.clone()).await.is_err() {
                // Consumer went away between matching and delivery.
                PipelinePack::recycle_shared(shared.clone());
            }
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("filter_matchers", &self.filter_matcher_count())
            .field("output_matchers", &self.output_matcher_count())
            .field("processed", &self.messages_processed())
            .finish()
    }
}

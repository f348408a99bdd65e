//! Message packs and the pack pools
//!
//! A [`PipelinePack`] is a reusable carrier for one message. All packs are
//! allocated once at startup into two bounded pools of equal capacity: one
//! feeding inputs, one feeding filter re-injection. Keeping the pools
//! separate is load-bearing: with a single pool, filters waiting for a free
//! pack while inputs hold them all would deadlock the pipeline.
//!
//! A pack checked out of a pool carries a sender back to its home pool.
//! When its reference count drops to zero it is reset and returned, so the
//! number of packs in circulation is fixed for the life of the process.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossfire::{MAsyncRx, MAsyncTx};
use rill_protocol::Message;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// Reusable carrier for one message moving through the pipeline
pub struct PipelinePack {
    /// The decoded message
    pub message: Message,

    /// Raw bytes the message was framed from, for decoders
    pub msg_bytes: Vec<u8>,

    /// How many times this message has been re-injected by filters
    pub msg_loop_count: u32,

    /// Signer attributed to the message, checked by matcher signer filters
    pub signer: Option<String>,

    /// Consumers still holding the pack after router fan-out
    ref_count: AtomicU32,

    /// Sender back to the pool this pack belongs to
    recycle_tx: MAsyncTx<PipelinePack>,
}

impl PipelinePack {
    fn new(recycle_tx: MAsyncTx<PipelinePack>) -> Self {
        Self {
            message: Message::default(),
            msg_bytes: Vec::new(),
            msg_loop_count: 0,
            signer: None,
            ref_count: AtomicU32::new(1),
            recycle_tx,
        }
    }

    /// Set the number of consumers about to receive this pack
    pub(crate) fn set_ref_count(&mut self, count: u32) {
        self.ref_count.store(count, Ordering::Release);
    }

    /// Clear the pack back to its pristine state
    fn reset(&mut self) {
        self.message.clear();
        self.msg_bytes.clear();
        self.msg_loop_count = 0;
        self.signer = None;
        self.ref_count.store(1, Ordering::Release);
    }

    /// Return an exclusively-owned pack to its pool
    pub fn recycle(mut self) {
        self.reset();
        let tx = self.recycle_tx.clone();
        // The pool can't be over capacity: every pack in existence came out
        // of it exactly once.
        if tx.try_send(self).is_err() {
            tracing::debug!("pack pool rejected a returning pack");
        }
    }

    /// Release one shared reference; the last holder returns it to the pool
    pub fn recycle_shared(pack: Arc<PipelinePack>) {
        if pack.ref_count.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        match Arc::try_unwrap(pack) {
            Ok(pack) => pack.recycle(),
            Err(_) => tracing::debug!("pack still shared after final release"),
        }
    }
}

impl std::fmt::Debug for PipelinePack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelinePack")
            .field("msg_loop_count", &self.msg_loop_count)
            .field("msg_bytes", &self.msg_bytes.len())
            .field("ref_count", &self.ref_count.load(Ordering::Relaxed))
            .finish()
    }
}

/// A bounded pool of pre-allocated packs
pub struct PackPool {
    tx: MAsyncTx<PipelinePack>,
    rx: MAsyncRx<PipelinePack>,
    capacity: usize,
}

impl PackPool {
    /// Allocate a pool holding `capacity` packs
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = crossfire::mpmc::bounded_async(capacity);
        for _ in 0..capacity {
            let _ = tx.try_send(PipelinePack::new(tx.clone()));
        }
        Self { tx, rx, capacity }
    }

    /// Take a pack, waiting until one is free or the abort signal fires
    pub async fn take(&self, abort: &CancellationToken) -> Result<PipelinePack, PipelineError> {
        tokio::select! {
            _ = abort.cancelled() => Err(PipelineError::Aborted),
            res = self.rx.recv() => res.map_err(|_| PipelineError::Aborted),
        }
    }

    /// Take a pack only if one is immediately free
    pub fn try_take(&self) -> Option<PipelinePack> {
        self.rx.try_recv().ok()
    }

    /// Number of packs the pool was allocated with
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for PackPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackPool")
            .field("capacity", &self.capacity)
            .finish()
    }
}

//! Process-wide runtime globals
//!
//! One `Globals` value is shared by the orchestrator, the router, and every
//! runner. It carries the decoded `[rilld]` settings plus the two pieces of
//! runtime state every blocking operation must observe: the abort token and
//! the shutting-down flag.

use std::sync::atomic::{AtomicBool, Ordering};

use rill_config::GlobalConfig;
use tokio_util::sync::CancellationToken;

/// Daemon-wide settings and shutdown state
#[derive(Debug)]
pub struct Globals {
    config: GlobalConfig,
    hostname: String,
    pid: u32,
    abort: CancellationToken,
    shutting_down: AtomicBool,
}

impl Globals {
    /// Wrap decoded global settings with fresh runtime state
    pub fn new(config: GlobalConfig) -> Self {
        let hostname = config.effective_hostname();
        Self {
            config,
            hostname,
            pid: std::process::id(),
            abort: CancellationToken::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// The decoded `[rilld]` settings
    #[inline]
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Host name stamped on generated messages
    #[inline]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Process id stamped on generated messages
    #[inline]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// The process-wide abort token
    ///
    /// Cloning a `CancellationToken` shares the underlying signal, so every
    /// holder observes the same cancellation.
    #[inline]
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Begin shutdown: set the flag, then fire the abort signal
    pub fn shut_down(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.abort.cancel();
    }

    /// Whether shutdown has begun
    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new(GlobalConfig::default())
    }
}

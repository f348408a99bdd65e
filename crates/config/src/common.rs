//! Per-category common plugin settings
//!
//! Every plugin section mixes settings the pipeline core understands
//! (ticker intervals, matcher specs, retry policy, ...) with settings only
//! the plugin itself understands. The core's share depends on the plugin's
//! category; the key lists below let the loader split a raw section into
//! the two halves before either is deserialized.

use serde::Deserialize;

/// Keys understood by the core for every category
pub const COMMON_KEYS: &[&str] = &["type"];

/// Keys understood by the core for Input sections
pub const INPUT_KEYS: &[&str] = &[
    "ticker_interval",
    "decoder",
    "splitter",
    "synchronous_decode",
    "send_decode_failures",
    "log_decode_failures",
    "can_exit",
    "retries",
];

/// Keys understood by the core for Filter and Output sections
pub const FILTER_OUTPUT_KEYS: &[&str] = &[
    "ticker_interval",
    "message_matcher",
    "message_signer",
    "can_exit",
    "retries",
    "encoder",
    "use_framing",
    "use_buffering",
    "buffering",
];

/// Keys understood by the core for Splitter sections
pub const SPLITTER_KEYS: &[&str] = &[
    "keep_truncated",
    "use_message_bytes",
    "min_buffer_size",
    "deliver_incomplete_final",
];

/// Retry policy shared by inputs, filters, and outputs
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryOptions {
    /// Longest delay between attempts, as a duration string
    pub max_delay: String,

    /// Starting delay between attempts
    pub delay: String,

    /// Upper bound on random jitter added to each delay
    pub max_jitter: String,

    /// Number of attempts before giving up; -1 retries forever
    pub max_retries: i32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_delay: "30s".to_string(),
            delay: "250ms".to_string(),
            max_jitter: "500ms".to_string(),
            max_retries: -1,
        }
    }
}

/// Disk-buffer settings for buffered outputs
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueBufferConfig {
    /// Largest size one queue file may grow to, in bytes
    pub max_file_size: u64,

    /// Largest total size of the buffer, in bytes; 0 means unbounded
    pub max_buffer_size: u64,

    /// What to do when the buffer fills: "shutdown", "drop", or "block"
    pub full_action: String,

    /// How many processed records may pass before the cursor is persisted
    pub cursor_update_count: u32,
}

impl Default for QueueBufferConfig {
    fn default() -> Self {
        Self {
            max_file_size: 128 * 1024 * 1024,
            max_buffer_size: 0,
            full_action: "shutdown".to_string(),
            cursor_update_count: 1,
        }
    }
}

/// Settings common to Input sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommonInputConfig {
    /// Seconds between timer events delivered to the plugin; 0 disables
    pub ticker_interval: u32,

    /// Instance name of the decoder fed by this input
    pub decoder: Option<String>,

    /// Instance name of the splitter framing this input's byte stream
    pub splitter: Option<String>,

    /// Run the decoder inline with the input instead of in its own runner
    pub synchronous_decode: Option<bool>,

    /// Route packs that failed decoding instead of discarding them
    pub send_decode_failures: Option<bool>,

    /// Log packs that failed decoding
    pub log_decode_failures: Option<bool>,

    /// Whether the daemon should survive this plugin exiting
    pub can_exit: Option<bool>,

    /// Retry policy for the plugin's connection handling
    pub retries: RetryOptions,
}

/// Settings common to Filter and Output sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommonFoConfig {
    /// Seconds between timer events delivered to the plugin; 0 disables
    pub ticker_interval: u32,

    /// Matcher spec deciding which messages this plugin receives
    pub message_matcher: String,

    /// Restrict matched messages to ones signed by this signer
    pub message_signer: Option<String>,

    /// Whether the daemon should survive this plugin exiting
    pub can_exit: Option<bool>,

    /// Retry policy for the plugin's delivery handling
    pub retries: RetryOptions,

    /// Instance name of the encoder used by an output
    pub encoder: Option<String>,

    /// Frame encoded records with the native stream framing (outputs)
    pub use_framing: Option<bool>,

    /// Spool matched messages through a disk buffer (outputs)
    pub use_buffering: Option<bool>,

    /// Disk-buffer settings, when buffering is enabled
    pub buffering: Option<QueueBufferConfig>,
}

/// Settings common to Splitter sections
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommonSplitterConfig {
    /// Deliver records that had to be truncated to fit the buffer
    pub keep_truncated: Option<bool>,

    /// Deliver raw record bytes instead of parsed message bytes
    pub use_message_bytes: Option<bool>,

    /// Smallest buffer the splitter runner will allocate, in bytes
    pub min_buffer_size: u32,

    /// Deliver a trailing incomplete record when the stream ends
    pub deliver_incomplete_final: Option<bool>,
}

//! Built-in plugins
//!
//! The decoders, encoders, and splitters every rill process ships with.
//! Most are registered as default instances when no explicit section
//! configures them; `MultiDecoder` is registered as an available type only.

use std::ops::Range;
use std::sync::Weak;

use prost::Message as _;
use regex::bytes::Regex;
use rill_protocol::{read_frame, Message, RECORD_SEPARATOR};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pack::PipelinePack;
use crate::plugin::{Decoder, Encoder, Plugin, Splitter, WantsHelper};

fn schema_entry(table: &mut toml::Table, key: &str, value: toml::Value) {
    table.insert(key.to_string(), value);
}

// ---------------------------------------------------------------------
// Protobuf message codecs
// ---------------------------------------------------------------------

/// Decodes native protobuf-framed message bytes
#[derive(Debug, Default)]
pub struct ProtobufDecoder;

impl Plugin for ProtobufDecoder {
    fn settings_schema(&self) -> Option<toml::Table> {
        Some(toml::Table::new())
    }

    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Decoder for ProtobufDecoder {
    fn decode(&mut self, pack: &mut PipelinePack) -> Result<(), PipelineError> {
        let message = Message::decode(pack.msg_bytes.as_slice())
            .map_err(|e| PipelineError::plugin("ProtobufDecoder", e.to_string()))?;
        pack.message = message;
        Ok(())
    }
}

/// Encodes messages back to native protobuf bytes
#[derive(Debug, Default)]
pub struct ProtobufEncoder;

impl Plugin for ProtobufEncoder {
    fn settings_schema(&self) -> Option<toml::Table> {
        Some(toml::Table::new())
    }

    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Encoder for ProtobufEncoder {
    fn encode(&mut self, pack: &PipelinePack) -> Result<Option<Vec<u8>>, PipelineError> {
        Ok(Some(pack.message.encode_to_vec()))
    }
}

// ---------------------------------------------------------------------
// MultiDecoder
// ---------------------------------------------------------------------

/// How a composite decoder runs its subs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CascadeStrategy {
    /// Stop at the first sub that decodes successfully
    FirstWins,
    /// Run every sub in order, failing on the first error
    All,
}

/// A decoder composed of named sibling decoders
///
/// Sub-decoder instances are created lazily on first use through the
/// injected pipeline handle, after every sub has been prepped.
#[derive(Default)]
pub struct MultiDecoder {
    subs: Vec<String>,
    cascade: Option<CascadeStrategy>,
    log_sub_errors: bool,
    helper: Option<Weak<PipelineConfig>>,
    decoders: Vec<Box<dyn Decoder>>,
}

impl MultiDecoder {
    fn resolve(&mut self) -> Result<(), PipelineError> {
        let helper = self
            .helper
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| PipelineError::plugin("MultiDecoder", "no pipeline handle"))?;
        for name in &self.subs {
            let decoder = helper.decoder(name).ok_or_else(|| {
                PipelineError::plugin("MultiDecoder", format!("unknown sub decoder '{name}'"))
            })?;
            self.decoders.push(decoder);
        }
        Ok(())
    }
}

impl Plugin for MultiDecoder {
    fn settings_schema(&self) -> Option<toml::Table> {
        let mut table = toml::Table::new();
        schema_entry(&mut table, "subs", toml::Value::Array(Vec::new()));
        schema_entry(
            &mut table,
            "cascade_strategy",
            toml::Value::String("first-wins".to_string()),
        );
        schema_entry(&mut table, "log_sub_errors", toml::Value::Boolean(false));
        Some(table)
    }

    fn init(&mut self, settings: &toml::Table) -> Result<(), PipelineError> {
        self.subs = settings
            .get("subs")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        if self.subs.is_empty() {
            return Err(PipelineError::InitFailed {
                plugin: "MultiDecoder".to_string(),
                message: "at least one entry required in 'subs'".to_string(),
            });
        }

        let strategy = settings
            .get("cascade_strategy")
            .and_then(|v| v.as_str())
            .unwrap_or("first-wins");
        self.cascade = match strategy {
            "first-wins" => Some(CascadeStrategy::FirstWins),
            "all" => Some(CascadeStrategy::All),
            other => {
                return Err(PipelineError::InitFailed {
                    plugin: "MultiDecoder".to_string(),
                    message: format!("unknown cascade_strategy '{other}'"),
                });
            }
        };
        self.log_sub_errors = settings
            .get("log_sub_errors")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(())
    }
}

impl Decoder for MultiDecoder {
    fn decode(&mut self, pack: &mut PipelinePack) -> Result<(), PipelineError> {
        if self.decoders.is_empty() {
            self.resolve()?;
        }
        match self.cascade.unwrap_or(CascadeStrategy::FirstWins) {
            CascadeStrategy::FirstWins => {
                for decoder in &mut self.decoders {
                    match decoder.decode(pack) {
                        Ok(()) => return Ok(()),
                        Err(e) if self.log_sub_errors => {
                            tracing::warn!(error = %e, "sub decoder failed");
                        }
                        Err(_) => {}
                    }
                }
                Err(PipelineError::plugin(
                    "MultiDecoder",
                    "no sub decoder matched",
                ))
            }
            CascadeStrategy::All => {
                for decoder in &mut self.decoders {
                    decoder.decode(pack)?;
                }
                Ok(())
            }
        }
    }

    fn wants_helper(&mut self) -> Option<&mut dyn WantsHelper> {
        Some(self)
    }
}

impl WantsHelper for MultiDecoder {
    fn set_helper(&mut self, helper: Weak<PipelineConfig>) {
        self.helper = Some(helper);
    }
}

// ---------------------------------------------------------------------
// Splitters
// ---------------------------------------------------------------------

/// Splits a stream on a single delimiter byte
#[derive(Debug)]
pub struct TokenSplitter {
    delimiter: u8,
}

impl Default for TokenSplitter {
    fn default() -> Self {
        Self { delimiter: b'\n' }
    }
}

impl Plugin for TokenSplitter {
    fn settings_schema(&self) -> Option<toml::Table> {
        let mut table = toml::Table::new();
        schema_entry(
            &mut table,
            "delimiter",
            toml::Value::String("\n".to_string()),
        );
        Some(table)
    }

    fn init(&mut self, settings: &toml::Table) -> Result<(), PipelineError> {
        let delimiter = settings
            .get("delimiter")
            .and_then(|v| v.as_str())
            .unwrap_or("\n");
        let [byte] = delimiter.as_bytes() else {
            return Err(PipelineError::InitFailed {
                plugin: "TokenSplitter".to_string(),
                message: "delimiter must be exactly one byte".to_string(),
            });
        };
        self.delimiter = *byte;
        Ok(())
    }
}

impl Splitter for TokenSplitter {
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        match buf.iter().position(|&b| b == self.delimiter) {
            // The delimiter stays attached to the record it terminates.
            Some(pos) => (pos + 1, Some(0..pos + 1)),
            None => (0, None),
        }
    }
}

/// Groups newline-delimited lines into multi-line records
///
/// A record starts at a line matching `grouping_pattern`; following lines
/// that don't match are continuation lines of the same record. Useful for
/// stack traces and other multi-line log entries.
#[derive(Debug)]
pub struct PatternGroupingSplitter {
    pattern: Regex,
}

impl Default for PatternGroupingSplitter {
    fn default() -> Self {
        Self {
            pattern: Regex::new("^").expect("trivial pattern"),
        }
    }
}

impl Plugin for PatternGroupingSplitter {
    fn settings_schema(&self) -> Option<toml::Table> {
        let mut table = toml::Table::new();
        schema_entry(
            &mut table,
            "grouping_pattern",
            toml::Value::String("^".to_string()),
        );
        Some(table)
    }

    fn init(&mut self, settings: &toml::Table) -> Result<(), PipelineError> {
        let pattern = settings
            .get("grouping_pattern")
            .and_then(|v| v.as_str())
            .unwrap_or("^");
        self.pattern = Regex::new(pattern).map_err(|e| PipelineError::InitFailed {
            plugin: "PatternGroupingSplitter".to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

impl Splitter for PatternGroupingSplitter {
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        let Some(first_end) = buf.iter().position(|&b| b == b'\n') else {
            return (0, None);
        };
        let mut end = first_end + 1;
        loop {
            let rest = &buf[end..];
            // A record is only complete once the start of the next one is
            // visible, so a trailing group waits for more data.
            let Some(next_end) = rest.iter().position(|&b| b == b'\n') else {
                return (0, None);
            };
            if self.pattern.is_match(&rest[..next_end]) {
                return (end, Some(0..end));
            }
            end += next_end + 1;
        }
    }
}

/// Splits the native stream framing back into records
#[derive(Debug, Default)]
pub struct RillFramingSplitter;

impl Plugin for RillFramingSplitter {
    fn settings_schema(&self) -> Option<toml::Table> {
        Some(toml::Table::new())
    }

    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Splitter for RillFramingSplitter {
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        if buf.is_empty() {
            return (0, None);
        }
        if buf[0] != RECORD_SEPARATOR {
            // Resynchronize: skip to the next frame start without emitting.
            return match buf.iter().position(|&b| b == RECORD_SEPARATOR) {
                Some(pos) => (pos, None),
                None => (buf.len(), None),
            };
        }
        match read_frame(buf) {
            Some((payload, consumed)) => (consumed, Some(payload)),
            None => (0, None),
        }
    }
}

/// Delivers each chunk unchanged as one record
#[derive(Debug, Default)]
pub struct NullSplitter;

impl Plugin for NullSplitter {
    fn settings_schema(&self) -> Option<toml::Table> {
        Some(toml::Table::new())
    }

    fn init(&mut self, _settings: &toml::Table) -> Result<(), PipelineError> {
        Ok(())
    }
}

impl Splitter for NullSplitter {
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        if buf.is_empty() {
            return (0, None);
        }
        (buf.len(), Some(0..buf.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_protocol::frame_record;

    fn records(splitter: &mut dyn Splitter, mut buf: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let (consumed, record) = splitter.find_record(buf);
            if consumed == 0 {
                return out;
            }
            if let Some(range) = record {
                out.push(buf[range].to_vec());
            }
            buf = &buf[consumed..];
        }
    }

    #[test]
    fn test_token_splitter_newlines() {
        let mut splitter = TokenSplitter::default();
        let out = records(&mut splitter, b"one\ntwo\nthree");
        assert_eq!(out, vec![b"one\n".to_vec(), b"two\n".to_vec()]);
    }

    #[test]
    fn test_token_splitter_custom_delimiter() {
        let mut splitter = TokenSplitter::default();
        let mut settings = toml::Table::new();
        settings.insert("delimiter".to_string(), toml::Value::String(";".to_string()));
        splitter.init(&settings).unwrap();
        let out = records(&mut splitter, b"a;b;");
        assert_eq!(out, vec![b"a;".to_vec(), b"b;".to_vec()]);
    }

    #[test]
    fn test_token_splitter_rejects_multibyte_delimiter() {
        let mut splitter = TokenSplitter::default();
        let mut settings = toml::Table::new();
        settings.insert(
            "delimiter".to_string(),
            toml::Value::String("ab".to_string()),
        );
        let err = splitter.init(&settings).unwrap_err();
        assert!(matches!(err, PipelineError::InitFailed { .. }));
    }

    #[test]
    fn test_pattern_grouping_collects_continuation_lines() {
        let mut splitter = PatternGroupingSplitter::default();
        let mut settings = splitter.settings_schema().unwrap();
        settings.insert(
            "grouping_pattern".to_string(),
            toml::Value::String("^\\d{4}-".to_string()),
        );
        splitter.init(&settings).unwrap();

        let stream = b"2024-01-01 boom\n  at frame one\n  at frame two\n2024-01-02 ok\n";
        let out = records(&mut splitter, stream);
        // The second record isn't complete until another dated line shows up.
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0],
            b"2024-01-01 boom\n  at frame one\n  at frame two\n".to_vec()
        );
    }

    #[test]
    fn test_pattern_grouping_rejects_bad_regex() {
        let mut splitter = PatternGroupingSplitter::default();
        let mut settings = splitter.settings_schema().unwrap();
        settings.insert(
            "grouping_pattern".to_string(),
            toml::Value::String("([".to_string()),
        );
        assert!(splitter.init(&settings).is_err());
    }

    #[test]
    fn test_framing_splitter_round_trip() {
        let mut splitter = RillFramingSplitter;
        let mut stream = frame_record(b"first");
        stream.extend_from_slice(&frame_record(b"second"));
        let out = records(&mut splitter, &stream);
        assert_eq!(out, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_framing_splitter_skips_garbage() {
        let mut splitter = RillFramingSplitter;
        let mut stream = b"junk".to_vec();
        stream.extend_from_slice(&frame_record(b"payload"));
        let out = records(&mut splitter, &stream);
        assert_eq!(out, vec![b"payload".to_vec()]);
    }

    #[test]
    fn test_null_splitter_passes_chunk_through() {
        let mut splitter = NullSplitter;
        let out = records(&mut splitter, b"whatever bytes");
        assert_eq!(out, vec![b"whatever bytes".to_vec()]);
    }

    #[test]
    fn test_protobuf_codec_round_trip() {
        let mut message = Message {
            payload: "round trip".to_string(),
            msg_type: "test".to_string(),
            ..Default::default()
        };
        message.set_uuid_v4();

        let pool = crate::pack::PackPool::new(1);
        let mut pack = pool.try_take().unwrap();
        pack.message = message.clone();

        let mut encoder = ProtobufEncoder;
        let bytes = encoder.encode(&pack).unwrap().unwrap();

        pack.message = Message::default();
        pack.msg_bytes = bytes;
        let mut decoder = ProtobufDecoder;
        decoder.decode(&mut pack).unwrap();
        assert_eq!(pack.message, message);
    }

    #[test]
    fn test_protobuf_decoder_rejects_garbage() {
        let pool = crate::pack::PackPool::new(1);
        let mut pack = pool.try_take().unwrap();
        pack.msg_bytes = vec![0xff, 0xff, 0xff];
        let mut decoder = ProtobufDecoder;
        assert!(decoder.decode(&mut pack).is_err());
    }

    #[test]
    fn test_multi_decoder_requires_subs() {
        let mut decoder = MultiDecoder::default();
        let settings = decoder.settings_schema().unwrap();
        let err = decoder.init(&settings).unwrap_err();
        assert!(matches!(err, PipelineError::InitFailed { .. }));
    }

    #[test]
    fn test_multi_decoder_rejects_unknown_strategy() {
        let mut decoder = MultiDecoder::default();
        let mut settings = decoder.settings_schema().unwrap();
        settings.insert(
            "subs".to_string(),
            toml::Value::Array(vec![toml::Value::String("ADecoder".to_string())]),
        );
        settings.insert(
            "cascade_strategy".to_string(),
            toml::Value::String("sometimes".to_string()),
        );
        assert!(decoder.init(&settings).is_err());
    }
}

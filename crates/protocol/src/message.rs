//! The message carrier
//!
//! A `Message` is the unit that moves through the pipeline: inputs produce
//! them, decoders populate them from raw bytes, filters inspect and re-emit
//! them, encoders turn them back into bytes for outputs. The wire shape is
//! protobuf so peers in other languages can produce and consume the stream.

use chrono::Utc;
use uuid::Uuid;

/// One event moving through the pipeline
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    /// Random identifier assigned when the message enters the pipeline
    #[prost(bytes = "vec", tag = "1")]
    pub uuid: Vec<u8>,

    /// Nanoseconds since the Unix epoch
    #[prost(int64, tag = "2")]
    pub timestamp: i64,

    /// Free-form type tag, used by matcher specs
    #[prost(string, tag = "3")]
    pub msg_type: String,

    /// Name of the component that generated the message
    #[prost(string, tag = "4")]
    pub logger: String,

    /// Syslog-style severity, 0 (emergency) through 7 (debug)
    #[prost(int32, tag = "5")]
    pub severity: i32,

    /// Message body
    #[prost(string, tag = "6")]
    pub payload: String,

    /// Process id of the generating process
    #[prost(int32, tag = "7")]
    pub pid: i32,

    /// Host the generating process runs on
    #[prost(string, tag = "8")]
    pub hostname: String,
}

impl Message {
    /// Severity used when a message doesn't set one
    pub const DEFAULT_SEVERITY: i32 = 7;

    /// Assign a fresh random UUID
    pub fn set_uuid_v4(&mut self) {
        self.uuid = Uuid::new_v4().as_bytes().to_vec();
    }

    /// Stamp the current wall-clock time
    pub fn set_timestamp_now(&mut self) {
        self.timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    }

    /// The UUID in canonical hyphenated form, when one is set
    pub fn uuid_string(&self) -> Option<String> {
        Uuid::from_slice(&self.uuid).ok().map(|u| u.to_string())
    }

    /// Reset every field to its empty default
    pub fn clear(&mut self) {
        *self = Message::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    #[test]
    fn test_uuid_assignment() {
        let mut msg = Message::default();
        assert!(msg.uuid_string().is_none());
        msg.set_uuid_v4();
        assert_eq!(msg.uuid.len(), 16);
        assert!(msg.uuid_string().is_some());
    }

    #[test]
    fn test_timestamp_now_is_recent() {
        let mut msg = Message::default();
        msg.set_timestamp_now();
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        assert!(msg.timestamp > 0);
        assert!(now - msg.timestamp < 5_000_000_000);
    }

    #[test]
    fn test_wire_round_trip() {
        let mut msg = Message {
            msg_type: "stat".to_string(),
            logger: "CounterFilter".to_string(),
            severity: 6,
            payload: "count=41".to_string(),
            pid: 1234,
            hostname: "edge-7".to_string(),
            ..Default::default()
        };
        msg.set_uuid_v4();
        msg.set_timestamp_now();

        let wire = msg.encode_to_vec();
        let decoded = Message::decode(wire.as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_clear() {
        let mut msg = Message {
            payload: "x".to_string(),
            ..Default::default()
        };
        msg.set_uuid_v4();
        msg.clear();
        assert!(msg.uuid.is_empty());
        assert!(msg.payload.is_empty());
    }
}

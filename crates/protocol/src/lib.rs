//! rill protocol
//!
//! The [`Message`] carrier that moves through the pipeline and the native
//! stream framing used when messages cross process boundaries.

mod framing;
mod message;

pub use framing::{
    frame_record, read_frame, HEADER_LEN, MAX_RECORD_SIZE, RECORD_SEPARATOR,
};
pub use message::Message;

//! Native stream framing
//!
//! When messages travel over a byte stream between rill processes, each
//! record is framed as:
//!
//! ```text
//! +------+----------------+---------...---+
//! | 0x1E | u32 BE length  | payload bytes |
//! +------+----------------+---------...---+
//! ```
//!
//! The separator byte lets a reader resynchronize after a corrupt record by
//! scanning forward for the next frame start.

/// Byte that opens every frame
pub const RECORD_SEPARATOR: u8 = 0x1e;

/// Bytes of overhead per framed record
pub const HEADER_LEN: usize = 1 + 4;

/// Largest payload a frame may carry
pub const MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// Wrap `payload` in a frame
pub fn frame_record(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(RECORD_SEPARATOR);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Try to read one frame from the front of `buf`
///
/// Returns `None` when `buf` doesn't yet hold a complete frame starting at
/// its first byte, otherwise the payload range and the total frame length.
pub fn read_frame(buf: &[u8]) -> Option<(std::ops::Range<usize>, usize)> {
    if buf.len() < HEADER_LEN || buf[0] != RECORD_SEPARATOR {
        return None;
    }
    let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if len > MAX_RECORD_SIZE || buf.len() < HEADER_LEN + len {
        return None;
    }
    Some((HEADER_LEN..HEADER_LEN + len, HEADER_LEN + len))
}

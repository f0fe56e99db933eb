//! Synthetic payloads shaped like real device output
//!
//! Raw payloads carry a little-endian TIFF/DNG signature and processed
//! payloads an HEIF `ftyp` box, so anything sniffing file headers sees the
//! expected formats.

use crate::types::{CorrelationId, PreviewFrame};
use bytes::{BufMut, Bytes, BytesMut};

/// Four-character code of the enhanced (computational) raw format
pub const ENHANCED_RAW_FOURCC: u32 = u32::from_be_bytes(*b"l64r");

/// Four-character code of a 10-bit Bayer raw format
pub const BAYER_RAW_FOURCC: u32 = u32::from_be_bytes(*b"bg10");

/// Raw deliverable payload for capture `id`
pub fn synthetic_raw_payload(id: CorrelationId, size: usize) -> Bytes {
    let mut data = BytesMut::with_capacity(size.max(16));
    data.put_slice(b"II*\0");
    data.put_u32_le(8);
    data.put_i64_le(id.0);
    fill_pattern(&mut data, size, id.0 as u8);
    data.freeze()
}

/// Processed (HEIF) deliverable payload for capture `id`
pub fn synthetic_processed_payload(id: CorrelationId, size: usize) -> Bytes {
    let mut data = BytesMut::with_capacity(size.max(20));
    data.put_u32(24);
    data.put_slice(b"ftypheic");
    data.put_u32(0);
    data.put_i64_le(id.0);
    fill_pattern(&mut data, size, (id.0 as u8).wrapping_mul(3));
    data.freeze()
}

/// Preview frame with a gradient that moves every frame
///
/// RGB24, `width * height * 3` bytes.
pub fn synthetic_preview_frame(sequence: u64, width: u32, height: u32) -> PreviewFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];
    let base = (sequence % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
    PreviewFrame::new(sequence, width, height, data)
}

fn fill_pattern(data: &mut BytesMut, size: usize, seed: u8) {
    let mut value = seed;
    while data.len() < size {
        data.put_u8(value);
        value = value.wrapping_add(1);
    }
}

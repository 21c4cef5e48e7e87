//! Base64 VLQ decoding as used by the `mappings` field.
//!
//! Each value is a little-endian sequence of 6-bit digits. Bit 5 of a digit marks a
//! continuation; the lowest bit of the assembled value is the sign.
//!
//! See: <https://tc39.es/source-map/#base64-vlq>

use super::SourceMapError;

const CONTINUATION_BIT: u32 = 1 << 5;
const DIGIT_MASK: u32 = CONTINUATION_BIT - 1;

fn base64_digit(byte: u8) -> Result<u32, SourceMapError> {
    let digit = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return Err(SourceMapError::InvalidBase64(byte as char)),
    };
    Ok(digit as u32)
}

/// Decode every VLQ value in `segment` into `out`.
///
/// `out` is cleared first so callers can reuse one buffer per mappings string.
pub fn decode_segment(segment: &str, out: &mut Vec<i64>) -> Result<(), SourceMapError> {
    out.clear();

    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut pending = false;

    for &byte in segment.as_bytes() {
        let digit = base64_digit(byte)?;
        if shift > 32 {
            return Err(SourceMapError::VlqOverflow);
        }
        value |= u64::from(digit & DIGIT_MASK) << shift;
        pending = true;

        if digit & CONTINUATION_BIT != 0 {
            shift += 5;
            continue;
        }

        let magnitude = (value >> 1) as i64;
        if magnitude > i64::from(u32::MAX) {
            return Err(SourceMapError::VlqOverflow);
        }
        out.push(if value & 1 == 1 { -magnitude } else { magnitude });

        value = 0;
        shift = 0;
        pending = false;
    }

    if pending {
        return Err(SourceMapError::TruncatedVlq);
    }
    Ok(())
}

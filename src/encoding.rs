//! Text encoding helpers
//!
//! Tokens and ciphertext envelopes are carried as standard (padded) base64
//! so they are plain ASCII and never contain the `.` envelope separator.

use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode bytes as standard base64 with padding.
pub fn encode_base64(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Decode standard base64, returning the original bytes.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    STANDARD.decode(encoded).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidEncoding,
            format!("illegal base64 data: {}", e),
            e,
        )
    })
}

/// Decode standard base64 that must hold UTF-8 text (such as an embedded token).
pub fn decode_base64_string(encoded: &str) -> Result<String> {
    let bytes = decode_base64(encoded)?;
    String::from_utf8(bytes).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidEncoding,
            "decoded base64 data is not valid UTF-8",
            e,
        )
    })
}

/// Left-pad `text` with repetitions of `pad` until it is at least `length`
/// characters long.
///
/// Lengths are counted in characters, not bytes. An empty `pad` leaves the
/// text unchanged.
pub fn pad_left(text: &str, length: usize, pad: &str) -> String {
    let missing = length.saturating_sub(text.chars().count());
    let mut padded = padding(pad, missing);
    padded.push_str(text);
    padded
}

/// Byte-level counterpart of [`pad_left`]: prepends `filler` until `bytes`
/// is at least `length` bytes long.
pub fn pad_left_bytes(bytes: &[u8], length: usize, filler: u8) -> Vec<u8> {
    let missing = length.saturating_sub(bytes.len());
    let mut padded = vec![filler; missing];
    padded.extend_from_slice(bytes);
    padded
}

/// `pad` repeated `count` times.
pub fn padding(pad: &str, count: usize) -> String {
    pad.repeat(count)
}

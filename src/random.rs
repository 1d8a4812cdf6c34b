//! Random source backed by the operating system CSPRNG

use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Alphabet for random strings: every printable ASCII character except space.
pub const LETTERS: &[u8] =
    b"!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// 7 bits cover the 94-letter alphabet; values past it are redrawn.
const LETTER_IDX_MASK: u8 = 0x7F;

fn fill(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::RandomnessFailure,
            format!("randomness source failed: {}", e),
            e,
        )
    })
}

/// `length` uniformly random bytes.
pub fn random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; length];
    fill(&mut buf)?;
    Ok(buf)
}

/// A string of `length` characters drawn uniformly from [`LETTERS`].
///
/// Uses rejection sampling so no letter is favoured.
pub fn random_string(length: usize) -> Result<String> {
    let mut buf = random_bytes(length)?;
    let mut i = 0;
    while i < length {
        let idx = (buf[i] & LETTER_IDX_MASK) as usize;
        if idx < LETTERS.len() {
            buf[i] = LETTERS[idx];
            i += 1;
        } else {
            fill(&mut buf[i..i + 1])?;
        }
    }
    String::from_utf8(buf).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "random string is not ASCII",
            e,
        )
    })
}

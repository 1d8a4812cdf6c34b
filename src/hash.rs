//! SHA-256 and HMAC-SHA256 helpers

use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Output length of SHA-256 and HMAC-SHA256 in bytes.
pub const DIGEST_LEN: usize = 32;

/// Hex-encoded SHA-256 checksum of `data`.
pub fn hash_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex-encoded HMAC-SHA256 of `text` under `key`.
pub fn hash_hmac(text: &[u8], key: &[u8]) -> Result<String> {
    Ok(hex::encode(hmac_sha256(key, &[text])?))
}

fn new_mac(key: &[u8]) -> Result<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(key).map_err(|e| {
        HierogolyphError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("HMAC rejected key: {}", e),
        )
    })
}

/// Raw HMAC-SHA256 over the concatenation of `parts`.
pub(crate) fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; DIGEST_LEN]> {
    let mut mac = new_mac(key)?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Constant-time check that `expected` is the HMAC-SHA256 of `parts` under `key`.
pub(crate) fn verify_hmac_sha256(key: &[u8], parts: &[&[u8]], expected: &[u8]) -> Result<bool> {
    let mut mac = new_mac(key)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.verify_slice(expected).is_ok())
}

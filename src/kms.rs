//! Key management backends that wrap and unwrap envelope key material
//!
//! The [`Kms`] trait is the seam for a remote key management service. The
//! mock backends here hold their master key in process memory and are meant
//! for tests and local tooling. Each one prepends a short ASCII tag to its
//! output and strips the tag again on unwrap when it is present.

use std::fmt;

use crate::crypto::{self, Algorithm};
use crate::error::Result;
use zeroize::Zeroizing;

/// Wraps small secrets (envelope key material) under a key the caller never sees.
pub trait Kms: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Unwrap a blob produced by [`Kms::encrypt`].
    ///
    /// A failed integrity check is reported as
    /// [`ErrorKind::AuthenticationFailed`](crate::error::ErrorKind::AuthenticationFailed),
    /// distinct from a short input.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Smallest wrapped blob this backend could possibly accept (its nonce size).
    fn min_ciphertext_len(&self) -> usize;
}

const GCM_PREFIX: &[u8] = b"GCMx";
const CHACHA20_PREFIX: &[u8] = b"ChaCha20x";

fn truncated_key(key: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(key[..key.len().min(crypto::MAX_KEY_LEN)].to_vec())
}

fn seal_prefixed(
    algorithm: Algorithm,
    prefix: &[u8],
    key: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let sealed = crypto::encrypt(algorithm, key, plaintext)?;
    let mut output = Vec::with_capacity(prefix.len() + sealed.len());
    output.extend_from_slice(prefix);
    output.extend_from_slice(&sealed);
    Ok(output)
}

fn open_prefixed(
    algorithm: Algorithm,
    prefix: &[u8],
    key: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let body = ciphertext.strip_prefix(prefix).unwrap_or(ciphertext);
    crypto::decrypt(algorithm, key, body)
}

/// In-process AES-GCM backend. Output is `"GCMx" || nonce || sealed`.
#[derive(Clone)]
pub struct MockAesGcmKms {
    key: Zeroizing<Vec<u8>>,
}

impl MockAesGcmKms {
    /// Keys longer than 32 bytes are truncated; invalid sizes fail on use.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: truncated_key(key.as_ref()),
        }
    }
}

impl fmt::Debug for MockAesGcmKms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockAesGcmKms")
            .field("key_len", &self.key.len())
            .finish()
    }
}

impl Kms for MockAesGcmKms {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal_prefixed(Algorithm::AesGcm, GCM_PREFIX, &self.key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open_prefixed(Algorithm::AesGcm, GCM_PREFIX, &self.key, ciphertext)
    }

    fn min_ciphertext_len(&self) -> usize {
        Algorithm::AesGcm.nonce_len()
    }
}

/// In-process ChaCha20-Poly1305 backend. Output is `"ChaCha20x" || nonce || sealed`.
#[derive(Clone)]
pub struct MockChaCha20Kms {
    key: Zeroizing<Vec<u8>>,
}

impl MockChaCha20Kms {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: truncated_key(key.as_ref()),
        }
    }
}

impl fmt::Debug for MockChaCha20Kms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockChaCha20Kms")
            .field("key_len", &self.key.len())
            .finish()
    }
}

impl Kms for MockChaCha20Kms {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal_prefixed(
            Algorithm::ChaCha20Poly1305,
            CHACHA20_PREFIX,
            &self.key,
            plaintext,
        )
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open_prefixed(
            Algorithm::ChaCha20Poly1305,
            CHACHA20_PREFIX,
            &self.key,
            ciphertext,
        )
    }

    fn min_ciphertext_len(&self) -> usize {
        Algorithm::ChaCha20Poly1305.nonce_len()
    }
}

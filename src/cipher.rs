//! Payload ciphers
//!
//! A [`Cipher`] seals the caller's payload under the content encryption key
//! derived by the envelope engine. Every implementation is authenticated: a
//! wrong key or a modified ciphertext fails with
//! [`ErrorKind::AuthenticationFailed`](crate::error::ErrorKind::AuthenticationFailed).

use crate::crypto::{self, Algorithm};
use crate::error::Result;

/// Authenticated symmetric encryption of arbitrary payloads.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>>;
}

/// AES-GCM with a random 12-byte nonce prefix.
///
/// Accepts 16, 24 or 32 byte keys; longer keys are truncated to 32 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::encrypt(Algorithm::AesGcm, key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::decrypt(Algorithm::AesGcm, key, ciphertext)
    }
}

/// ChaCha20-Poly1305 with a random 12-byte nonce prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaCha20Poly1305Cipher;

impl Cipher for ChaCha20Poly1305Cipher {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::encrypt(Algorithm::ChaCha20Poly1305, key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::decrypt(Algorithm::ChaCha20Poly1305, key, ciphertext)
    }
}

/// NaCl secretbox with a random 24-byte nonce prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct XSalsa20Poly1305Cipher;

impl Cipher for XSalsa20Poly1305Cipher {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::encrypt(Algorithm::XSalsa20Poly1305, key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::decrypt(Algorithm::XSalsa20Poly1305, key, ciphertext)
    }
}

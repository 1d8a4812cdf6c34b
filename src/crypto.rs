//! Nonce-prefixed AEAD sealing shared by the cipher and mock KMS adapters
//!
//! Every algorithm here produces the same layout:
//! - nonce: `nonce_len()` bytes, fresh from the OS random source
//! - sealed box: ciphertext followed by the 16-byte authentication tag
//!
//! Keys longer than 32 bytes are truncated to their first 32 bytes.

use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use crate::random;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use chacha20poly1305::ChaCha20Poly1305;
use crypto_secretbox::XSalsa20Poly1305;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Longest key any algorithm uses; longer keys are truncated to this.
pub const MAX_KEY_LEN: usize = 32;

/// AEAD algorithms available to ciphers and mock key management backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AES-GCM with a 16, 24 or 32 byte key and 12 byte nonce.
    AesGcm,
    /// ChaCha20-Poly1305 with a 32 byte key and 12 byte nonce.
    ChaCha20Poly1305,
    /// NaCl secretbox (XSalsa20-Poly1305) with a 32 byte key and 24 byte nonce.
    XSalsa20Poly1305,
}

impl Algorithm {
    /// Length of the nonce prefixed to every sealed message.
    pub fn nonce_len(self) -> usize {
        match self {
            Self::AesGcm | Self::ChaCha20Poly1305 => 12,
            Self::XSalsa20Poly1305 => 24,
        }
    }
}

fn truncate_key(key: &[u8]) -> &[u8] {
    &key[..key.len().min(MAX_KEY_LEN)]
}

fn new_cipher<C: KeyInit>(key: &[u8]) -> Result<C> {
    C::new_from_slice(key).map_err(|_| HierogolyphError::invalid_key_size(key.len()))
}

fn seal_with<C: Aead>(cipher: &C, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    cipher
        .encrypt(GenericArray::from_slice(nonce), plaintext)
        .map_err(|e| {
            HierogolyphError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::Backend,
                format!("encryption failed: {}", e),
            )
        })
}

fn open_with<C: Aead>(cipher: &C, nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    cipher
        .decrypt(GenericArray::from_slice(nonce), sealed)
        .map_err(|_| HierogolyphError::authentication_failed())
}

fn seal(algorithm: Algorithm, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = truncate_key(key);
    match algorithm {
        Algorithm::AesGcm => match key.len() {
            16 => seal_with(&new_cipher::<Aes128Gcm>(key)?, nonce, plaintext),
            24 => seal_with(&new_cipher::<Aes192Gcm>(key)?, nonce, plaintext),
            32 => seal_with(&new_cipher::<Aes256Gcm>(key)?, nonce, plaintext),
            other => Err(HierogolyphError::invalid_key_size(other)),
        },
        Algorithm::ChaCha20Poly1305 => {
            seal_with(&new_cipher::<ChaCha20Poly1305>(key)?, nonce, plaintext)
        }
        Algorithm::XSalsa20Poly1305 => {
            seal_with(&new_cipher::<XSalsa20Poly1305>(key)?, nonce, plaintext)
        }
    }
}

fn open(algorithm: Algorithm, key: &[u8], nonce: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    let key = truncate_key(key);
    match algorithm {
        Algorithm::AesGcm => match key.len() {
            16 => open_with(&new_cipher::<Aes128Gcm>(key)?, nonce, sealed),
            24 => open_with(&new_cipher::<Aes192Gcm>(key)?, nonce, sealed),
            32 => open_with(&new_cipher::<Aes256Gcm>(key)?, nonce, sealed),
            other => Err(HierogolyphError::invalid_key_size(other)),
        },
        Algorithm::ChaCha20Poly1305 => {
            open_with(&new_cipher::<ChaCha20Poly1305>(key)?, nonce, sealed)
        }
        Algorithm::XSalsa20Poly1305 => {
            open_with(&new_cipher::<XSalsa20Poly1305>(key)?, nonce, sealed)
        }
    }
}

/// Encrypt plaintext under `key` with a random nonce
///
/// Returns the binary format: nonce(nonce_len) + sealedbox(variable)
pub fn encrypt(algorithm: Algorithm, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = random::random_bytes(algorithm.nonce_len())?;
    encrypt_deterministic(algorithm, key, plaintext, &nonce)
}

/// Encrypt plaintext under `key` using the provided nonce
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates a random nonce.
pub fn encrypt_deterministic(
    algorithm: Algorithm,
    key: &[u8],
    plaintext: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>> {
    if nonce.len() != algorithm.nonce_len() {
        return Err(HierogolyphError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!(
                "nonce must be {} bytes, got {}",
                algorithm.nonce_len(),
                nonce.len()
            ),
        ));
    }
    let sealed_box = seal(algorithm, key, nonce, plaintext)?;

    let mut output = Vec::with_capacity(nonce.len() + sealed_box.len());
    output.extend_from_slice(nonce);
    output.extend_from_slice(&sealed_box);
    Ok(output)
}

/// Decrypt output of [`encrypt`] under `key`
pub fn decrypt(algorithm: Algorithm, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let nonce_len = algorithm.nonce_len();
    if ciphertext.len() < nonce_len {
        return Err(HierogolyphError::ciphertext_too_short(
            ciphertext.len(),
            nonce_len,
        ));
    }
    let (nonce, sealed_box) = ciphertext.split_at(nonce_len);
    open(algorithm, key, nonce, sealed_box)
}

//! Password-bound envelope encryption
//!
//! A [`Hierogolyph`] holds a password, a public salt and a wrapped-key token.
//! The token is produced by [`create_encryption_key`]:
//!
//! - key material: 32 random bytes
//! - fingerprint: HMAC-SHA256 under the configured HMAC secret over the
//!   length-prefixed password, salt and key material
//! - token: base64 of the key management backend sealing `fingerprint || key material`
//!
//! Unlocking reverses this, checks the fingerprint, and whitens the key
//! material with two password/salt digests to form the content encryption key
//! (CEK). The CEK is never stored.
//!
//! Ciphertext envelopes carry their own token so that decryption needs only
//! the password, the salt and the same configuration:
//!
//! ```text
//! base64(token) "." base64(cipher output)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::encoding;
use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use crate::hash;
use crate::hasher::Hasher;
use crate::kms::Kms;
use crate::random;

/// Length of a generated salt, in characters.
pub const SALT_LEN: usize = 32;

/// Length of the random key material sealed in every token.
pub const KEY_MATERIAL_LEN: usize = 32;

/// Length of each half of the digest pair.
pub const DIGEST_HALF_LEN: usize = 16;

const ENVELOPE_SEPARATOR: char = '.';

const FINGERPRINT_ERROR_PREFIX: &str = "HMAC finger print error:";

/// Salt and token pair, the only state that needs persisting between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub salt: String,
    pub encryption_key: String,
}

/// Password-bound envelope over a shared [`Config`].
#[derive(Clone)]
pub struct Hierogolyph {
    config: Config,
    password: Zeroizing<Vec<u8>>,
    salt: String,
    encryption_key: String,
}

impl Hierogolyph {
    /// Create an envelope with a fresh random salt and a fresh wrapped key.
    pub fn create(password: impl AsRef<[u8]>, config: Config) -> Result<Self> {
        let salt = random::random_string(SALT_LEN)?;
        let mut envelope = Self::new(password, salt, config);
        envelope.set_encryption_key()?;
        Ok(envelope)
    }

    /// An envelope without a token.
    ///
    /// Such an instance can still [`decrypt`](Self::decrypt), since every
    /// ciphertext carries its own token, but cannot encrypt until
    /// [`set_encryption_key`](Self::set_encryption_key) is called.
    pub fn new(password: impl AsRef<[u8]>, salt: impl Into<String>, config: Config) -> Self {
        Self {
            config,
            password: Zeroizing::new(password.as_ref().to_vec()),
            salt: salt.into(),
            encryption_key: String::new(),
        }
    }

    pub fn with_encryption_key(mut self, encryption_key: impl Into<String>) -> Self {
        self.encryption_key = encryption_key.into();
        self
    }

    pub fn from_record(
        password: impl AsRef<[u8]>,
        record: EnvelopeRecord,
        config: Config,
    ) -> Self {
        Self::new(password, record.salt, config).with_encryption_key(record.encryption_key)
    }

    pub fn record(&self) -> EnvelopeRecord {
        EnvelopeRecord {
            salt: self.salt.clone(),
            encryption_key: self.encryption_key.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn encryption_key(&self) -> &str {
        &self.encryption_key
    }

    /// Replace the token with a freshly generated one.
    ///
    /// Ciphertexts made under the previous token stay decryptable because they
    /// embed it.
    pub fn set_encryption_key(&mut self) -> Result<()> {
        self.encryption_key = create_encryption_key(
            &self.password,
            self.salt.as_bytes(),
            self.config.hmac_key(),
            self.config.kms(),
        )?;
        Ok(())
    }

    /// Derive the hex-encoded content encryption key from the stored token.
    pub fn unlock(&self) -> Result<Zeroizing<String>> {
        unlock_token(&self.password, &self.salt, &self.encryption_key, &self.config)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let cek = self.unlock()?;
        let key = cek_bytes(&cek)?;
        let payload = self.config.cipher().encrypt(plaintext, &key)?;
        debug!(
            plaintext_len = plaintext.len(),
            payload_len = payload.len(),
            "encrypted payload"
        );

        let mut envelope = encoding::encode_base64(self.encryption_key.as_bytes());
        envelope.push(ENVELOPE_SEPARATOR);
        envelope.push_str(&encoding::encode_base64(&payload));
        Ok(envelope)
    }

    /// Decrypt an envelope using the token embedded in it.
    ///
    /// The stored token is ignored and left untouched.
    pub fn decrypt(&self, envelope: &str) -> Result<Vec<u8>> {
        let (token, payload) = split_envelope(envelope)?;
        let cek = unlock_token(&self.password, &self.salt, &token, &self.config)?;
        let key = cek_bytes(&cek)?;
        let plaintext = self.config.cipher().decrypt(&payload, &key)?;
        debug!(plaintext_len = plaintext.len(), "decrypted payload");
        Ok(plaintext)
    }
}

impl fmt::Debug for Hierogolyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierogolyph")
            .field("salt", &self.salt)
            .field("encryption_key", &self.encryption_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn split_envelope(envelope: &str) -> Result<(String, Vec<u8>)> {
    let mut parts = envelope.split(ENVELOPE_SEPARATOR);
    let (token, payload) = match (parts.next(), parts.next(), parts.next()) {
        (Some(token), Some(payload), None) => (token, payload),
        _ => {
            return Err(HierogolyphError::with_kind(
                ErrorCategory::User,
                ErrorKind::MalformedEnvelope,
                format!(
                    "cipherText=[{}] must have one dot `{}`",
                    envelope, ENVELOPE_SEPARATOR
                ),
            ));
        }
    };
    let token = encoding::decode_base64_string(token)?;
    let payload = encoding::decode_base64(payload)?;
    Ok((token, payload))
}

fn cek_bytes(cek: &str) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(cek).map(Zeroizing::new).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "content encryption key is not valid hex",
            e,
        )
    })
}

fn fingerprint_parts<'a>(
    subject_a: &'a [u8],
    subject_b: &'a [u8],
    key_material: &'a [u8],
    prefixes: &'a ([u8; 8], [u8; 8]),
) -> [&'a [u8]; 5] {
    [&prefixes.0, subject_a, &prefixes.1, subject_b, key_material]
}

fn length_prefixes(subject_a: &[u8], subject_b: &[u8]) -> ([u8; 8], [u8; 8]) {
    (
        (subject_a.len() as u64).to_be_bytes(),
        (subject_b.len() as u64).to_be_bytes(),
    )
}

fn fingerprint_error(detail: impl fmt::Display) -> HierogolyphError {
    HierogolyphError::with_kind(
        ErrorCategory::User,
        ErrorKind::FingerprintMismatch,
        format!("{} {}", FINGERPRINT_ERROR_PREFIX, detail),
    )
}

/// Generate fresh key material, fingerprint it and seal it through `kms`.
///
/// Returns the base64 token. Every call yields a different token.
pub fn create_encryption_key(
    subject_a: &[u8],
    subject_b: &[u8],
    hmac_key: &[u8],
    kms: &dyn Kms,
) -> Result<String> {
    let key_material = Zeroizing::new(random::random_bytes(KEY_MATERIAL_LEN)?);
    let prefixes = length_prefixes(subject_a, subject_b);
    let fingerprint = hash::hmac_sha256(
        hmac_key,
        &fingerprint_parts(subject_a, subject_b, &key_material, &prefixes),
    )?;

    let mut blob = Zeroizing::new(Vec::with_capacity(hash::DIGEST_LEN + KEY_MATERIAL_LEN));
    blob.extend_from_slice(&fingerprint);
    blob.extend_from_slice(&key_material);

    let wrapped = kms.encrypt(&blob)?;
    debug!(wrapped_len = wrapped.len(), "created encryption key");
    Ok(encoding::encode_base64(&wrapped))
}

/// Derive the hex CEK for `token` without touching any envelope state.
pub fn unlock_token(
    password: &[u8],
    salt: &str,
    token: &str,
    config: &Config,
) -> Result<Zeroizing<String>> {
    let wrapped = encoding::decode_base64(token)?;
    let minimum = config.kms().min_ciphertext_len();
    if wrapped.len() < minimum {
        return Err(HierogolyphError::ciphertext_too_short(
            wrapped.len(),
            minimum,
        ));
    }

    let blob = Zeroizing::new(config.kms().decrypt(&wrapped)?);
    if blob.len() != hash::DIGEST_LEN + KEY_MATERIAL_LEN {
        warn!(blob_len = blob.len(), "unwrapped key has unexpected length");
        return Err(fingerprint_error(format!(
            "unwrapped key has length {}, expected {}",
            blob.len(),
            hash::DIGEST_LEN + KEY_MATERIAL_LEN
        )));
    }
    let (fingerprint, key_material) = blob.split_at(hash::DIGEST_LEN);

    let prefixes = length_prefixes(password, salt.as_bytes());
    let verified = hash::verify_hmac_sha256(
        config.hmac_key(),
        &fingerprint_parts(password, salt.as_bytes(), key_material, &prefixes),
        fingerprint,
    )?;
    if !verified {
        warn!("fingerprint mismatch while unlocking encryption key");
        return Err(fingerprint_error(
            "fingerprint does not match password, salt and key material",
        ));
    }

    let (d1, d2) = create_digests(password, salt.as_bytes(), config.hasher())?;
    let half = KEY_MATERIAL_LEN / 2;
    let w1 = Zeroizing::new(xor(&d1, &key_material[..half]));
    let w2 = Zeroizing::new(xor(&d2, &key_material[half..]));
    debug!("unlocked encryption key");
    Ok(Zeroizing::new(create_cek(&w1, &w2)))
}

/// The digest pair `(H(password, salt), H(salt, password))`, each
/// [`DIGEST_HALF_LEN`] bytes.
pub fn create_digests(
    password: &[u8],
    salt: &[u8],
    hasher: &dyn Hasher,
) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>)> {
    let d1 = Zeroizing::new(hasher.hash(password, salt, DIGEST_HALF_LEN)?);
    let d2 = Zeroizing::new(hasher.hash(salt, password, DIGEST_HALF_LEN)?);
    Ok((d1, d2))
}

/// Byte-wise XOR with an output exactly as long as `a`.
///
/// A shorter `b` is left-padded with `'0'`; a longer `b` is cut to `a.len()`.
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    let b = if b.len() < a.len() {
        encoding::pad_left_bytes(b, a.len(), b'0')
    } else {
        b[..a.len()].to_vec()
    };
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

/// Hex SHA-256 of `a || b`.
pub fn create_cek(a: &[u8], b: &[u8]) -> String {
    let mut joined = Zeroizing::new(Vec::with_capacity(a.len() + b.len()));
    joined.extend_from_slice(a);
    joined.extend_from_slice(b);
    hash::hash_sha256(&joined)
}

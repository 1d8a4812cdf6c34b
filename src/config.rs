//! Adapter selection for the envelope engine
//!
//! [`Config`] bundles one cipher, one key management backend, one hasher and
//! the HMAC secret used for fingerprints. It is cheap to clone: the adapters
//! and the secret live behind `Arc`s and are shared read-only.
//!
//! [`ConfigFile`] is the declarative TOML form used by the command line tool:
//!
//! ```toml
//! cipher = "aes-gcm"
//! hmac_key = { env = "HIEROGOLYPH_HMAC_KEY" }
//!
//! [hasher]
//! algorithm = "argon2"
//! memory = 65536
//!
//! [kms]
//! algorithm = "mock-aes-gcm"
//! key = { hex = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff" }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher::{AesGcmCipher, ChaCha20Poly1305Cipher, Cipher, XSalsa20Poly1305Cipher};
use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use crate::hasher::{self, Hasher};
use crate::kms::{Kms, MockAesGcmKms, MockChaCha20Kms};

/// Immutable selection of adapters plus the shared HMAC secret.
#[derive(Clone)]
pub struct Config {
    cipher: Arc<dyn Cipher>,
    kms: Arc<dyn Kms>,
    hasher: Arc<dyn Hasher>,
    hmac_key: Arc<Zeroizing<Vec<u8>>>,
}

impl Config {
    pub fn new(
        cipher: impl Cipher + 'static,
        kms: impl Kms + 'static,
        hasher: impl Hasher + 'static,
        hmac_key: impl AsRef<[u8]>,
    ) -> Self {
        Self::from_shared(
            Arc::new(cipher),
            Arc::new(kms),
            Arc::new(hasher),
            hmac_key,
        )
    }

    /// Build from adapters that are already shared elsewhere.
    pub fn from_shared(
        cipher: Arc<dyn Cipher>,
        kms: Arc<dyn Kms>,
        hasher: Arc<dyn Hasher>,
        hmac_key: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            cipher,
            kms,
            hasher,
            hmac_key: Arc::new(Zeroizing::new(hmac_key.as_ref().to_vec())),
        }
    }

    pub fn cipher(&self) -> &dyn Cipher {
        self.cipher.as_ref()
    }

    pub fn kms(&self) -> &dyn Kms {
        self.kms.as_ref()
    }

    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }

    pub fn with_cipher(&self, cipher: impl Cipher + 'static) -> Self {
        Self {
            cipher: Arc::new(cipher),
            ..self.clone()
        }
    }

    pub fn with_kms(&self, kms: impl Kms + 'static) -> Self {
        Self {
            kms: Arc::new(kms),
            ..self.clone()
        }
    }

    pub fn with_hasher(&self, hasher: impl Hasher + 'static) -> Self {
        Self {
            hasher: Arc::new(hasher),
            ..self.clone()
        }
    }

    pub fn with_hmac_key(&self, hmac_key: impl AsRef<[u8]>) -> Self {
        Self {
            hmac_key: Arc::new(Zeroizing::new(hmac_key.as_ref().to_vec())),
            ..self.clone()
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("hmac_key_len", &self.hmac_key.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherKind {
    #[default]
    #[serde(rename = "aes-gcm")]
    AesGcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
    #[serde(rename = "xsalsa20-poly1305")]
    XSalsa20Poly1305,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum HasherConfig {
    Argon2(hasher::Argon2),
    Scrypt(hasher::Scrypt),
    Pbkdf2(hasher::Pbkdf2),
    Balloon(hasher::Balloon),
    #[serde(rename = "insecure-sha256")]
    InsecureSha256,
    #[serde(rename = "insecure-sha512")]
    InsecureSha512,
    #[serde(rename = "insecure-sha3")]
    InsecureSha3,
    #[serde(rename = "insecure-blake2b")]
    InsecureBlake2b,
    #[serde(rename = "insecure-blake2s")]
    InsecureBlake2s,
}

impl HasherConfig {
    /// Why this selection is unsafe for real passwords, if it is.
    pub fn weakness(&self) -> Option<&'static str> {
        match self {
            Self::Argon2(h) if h.is_weak() => Some("argon2 memory cost is below the default"),
            Self::Scrypt(h) if h.is_weak() => Some("scrypt cost is below the default"),
            Self::Pbkdf2(h) if h.is_weak() => {
                Some("pbkdf2 iteration count is below the default")
            }
            Self::Balloon(h) if h.is_weak() => {
                Some("balloon space or time cost is below the default")
            }
            Self::InsecureSha256
            | Self::InsecureSha512
            | Self::InsecureSha3
            | Self::InsecureBlake2b
            | Self::InsecureBlake2s => Some("plain digest hasher is not a password hash"),
            _ => None,
        }
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::Argon2(hasher::Argon2::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KmsKind {
    #[serde(rename = "mock-aes-gcm")]
    MockAesGcm,
    #[serde(rename = "mock-chacha20")]
    MockChaCha20,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KmsConfig {
    pub algorithm: KmsKind,
    pub key: SecretSource,
}

/// Where a secret comes from. Inline values are convenient for tests but
/// end up in the file; prefer `env`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// Raw UTF-8 bytes of the given string.
    Value(String),
    /// Hex-encoded bytes.
    Hex(String),
    /// Raw UTF-8 bytes of the named environment variable.
    Env(String),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Hex(_) => f.write_str("Hex(..)"),
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
        }
    }
}

impl SecretSource {
    pub fn resolve(&self) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Value(value) => Ok(Zeroizing::new(value.as_bytes().to_vec())),
            Self::Hex(encoded) => hex::decode(encoded).map(Zeroizing::new).map_err(|e| {
                HierogolyphError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::InvalidConfiguration,
                    format!("invalid hex secret: {}", e),
                    e,
                )
            }),
            Self::Env(name) => {
                let value = std::env::var(name).map_err(|e| {
                    HierogolyphError::with_kind_and_source(
                        ErrorCategory::User,
                        ErrorKind::InvalidConfiguration,
                        format!("environment variable {} is not usable: {}", name, e),
                        e,
                    )
                })?;
                Ok(Zeroizing::new(value.into_bytes()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub cipher: CipherKind,
    #[serde(default)]
    pub hasher: HasherConfig,
    pub kms: KmsConfig,
    pub hmac_key: SecretSource,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            HierogolyphError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to read config {}: {}", path.display(), e),
                e,
            )
        })?;
        Self::parse(&contents)
            .map_err(|e| e.with_context(format!("failed to parse config {}", path.display())))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            HierogolyphError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidConfiguration,
                format!("invalid config: {}", e),
                e,
            )
        })
    }

    pub fn into_config(self) -> Result<Config> {
        debug!(
            cipher = ?self.cipher,
            hasher = ?self.hasher,
            kms = ?self.kms.algorithm,
            "building config"
        );

        let cipher: Arc<dyn Cipher> = match self.cipher {
            CipherKind::AesGcm => Arc::new(AesGcmCipher),
            CipherKind::ChaCha20Poly1305 => Arc::new(ChaCha20Poly1305Cipher),
            CipherKind::XSalsa20Poly1305 => Arc::new(XSalsa20Poly1305Cipher),
        };
        let hasher: Arc<dyn Hasher> = match self.hasher {
            HasherConfig::Argon2(h) => Arc::new(h),
            HasherConfig::Scrypt(h) => Arc::new(h),
            HasherConfig::Pbkdf2(h) => Arc::new(h),
            HasherConfig::Balloon(h) => Arc::new(h),
            HasherConfig::InsecureSha256 => Arc::new(hasher::InsecureSha256),
            HasherConfig::InsecureSha512 => Arc::new(hasher::InsecureSha512),
            HasherConfig::InsecureSha3 => Arc::new(hasher::InsecureSha3),
            HasherConfig::InsecureBlake2b => Arc::new(hasher::InsecureBlake2b),
            HasherConfig::InsecureBlake2s => Arc::new(hasher::InsecureBlake2s),
        };
        if let Some(weakness) = self.hasher.weakness() {
            warn!(hasher = ?self.hasher, "{}", weakness);
        }
        let kms_key = self
            .kms
            .key
            .resolve()
            .map_err(|e| e.with_context("failed to resolve kms key"))?;
        let kms: Arc<dyn Kms> = match self.kms.algorithm {
            KmsKind::MockAesGcm => Arc::new(MockAesGcmKms::new(&*kms_key)),
            KmsKind::MockChaCha20 => Arc::new(MockChaCha20Kms::new(&*kms_key)),
        };
        let hmac_key = self
            .hmac_key
            .resolve()
            .map_err(|e| e.with_context("failed to resolve hmac key"))?;

        Ok(Config::from_shared(cipher, kms, hasher, &*hmac_key))
    }
}

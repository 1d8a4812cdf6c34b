//! Hierogolyph - password-based envelope encryption
//!
//! A random data key is sealed by a key management backend, bound to the
//! password and salt by an HMAC fingerprint, and carried inside every
//! ciphertext. Decrypting needs only the password, the salt and the same
//! [`Config`].
//!
//! ```no_run
//! use hierogolyph::{AesGcmCipher, Argon2, Config, Hierogolyph, MockAesGcmKms};
//!
//! # fn main() -> hierogolyph::Result<()> {
//! let config = Config::new(
//!     AesGcmCipher,
//!     MockAesGcmKms::new(b"an example 32 byte master key!!!"),
//!     Argon2::default(),
//!     b"hmac secret",
//! );
//! let envelope = Hierogolyph::create("password", config.clone())?;
//! let ciphertext = envelope.encrypt(b"secret text")?;
//!
//! let other = Hierogolyph::new("password", envelope.salt(), config);
//! assert_eq!(other.decrypt(&ciphertext)?, b"secret text");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod cipher;
pub mod config;
mod crypto;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod hash;
pub mod hasher;
pub mod kms;
pub mod password;
pub mod random;

pub use cipher::{AesGcmCipher, ChaCha20Poly1305Cipher, Cipher, XSalsa20Poly1305Cipher};
pub use config::{Config, ConfigFile};
pub use envelope::{EnvelopeRecord, Hierogolyph};
pub use error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
pub use hasher::{
    Argon2, Balloon, Hasher, InsecureBlake2b, InsecureBlake2s, InsecureSha3, InsecureSha256,
    InsecureSha512, Pbkdf2, Scrypt,
};
pub use kms::{Kms, MockAesGcmKms, MockChaCha20Kms};

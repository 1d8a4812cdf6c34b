//! Error type shared by the envelope engine, its adapters and the CLI
//!
//! Every fallible call returns [`HierogolyphError`]. The [`ErrorCategory`]
//! tells a front end whether to blame the input (wrong password, corrupt
//! envelope, bad config) or the environment. The optional [`ErrorKind`] names
//! the exact protocol step that failed.

use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Not attributable to the caller's input: OS randomness, filesystem
    /// trouble, a broken invariant. Unknown causes land here too, so this is
    /// not proof that the input was fine.
    Internal,

    /// Caused by what the caller supplied: a password, salt, envelope, key
    /// or configuration value.
    User,
}

/// Which step of wrapping, unlocking, framing or file handling failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Base64, hex or UTF-8 decoding failed at a framing or token boundary.
    InvalidEncoding,
    /// A ciphertext envelope did not contain exactly one `.` separator.
    MalformedEnvelope,
    /// Input was shorter than the minimum the unwrapping/decrypting
    /// operation requires (its nonce size).
    CiphertextTooShort { size: usize, minimum: usize },
    /// The HMAC over unwrapped key material did not match the embedded
    /// fingerprint: wrong password, wrong salt, wrong HMAC key, or tampering.
    FingerprintMismatch,
    /// AEAD tag verification failed in a cipher or key management backend,
    /// due to a wrong key, tampering or corruption.
    AuthenticationFailed,
    /// Any other failure reported by a cipher, hasher or key management
    /// adapter (for example an unsupported key size).
    Backend,
    /// The system's random number generator failed to produce bytes.
    RandomnessFailure,
    /// A configuration file or value was missing or invalid.
    InvalidConfiguration,
    /// No password could be read, or the confirmation did not match.
    PasswordUnavailable,
    /// A value produced by this crate failed its own sanity check.
    InternalInvariant,
    /// Reading or writing a record, config, input or output file failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct HierogolyphError {
    pub category: ErrorCategory,
    /// Set wherever the failing step is known. Envelope callers usually
    /// match on `FingerprintMismatch` and `AuthenticationFailed`; code must
    /// still cope with `None`.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl HierogolyphError {
    fn build(
        category: ErrorCategory,
        kind: Option<ErrorKind>,
        msg: impl Into<String>,
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            category,
            kind,
            source,
            msg: msg.into(),
        }
    }

    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self::build(category, None, msg, None)
    }

    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::build(category, Some(kind), msg, None)
    }

    /// Keep the adapter crate's error (aes-gcm, toml, io, ...) as the source.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::build(category, None, msg, Some(Box::new(source)))
    }

    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::build(category, Some(kind), msg, Some(Box::new(source)))
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// True for failures a user can fix by changing what they supplied.
    pub fn is_user_error(&self) -> bool {
        self.category == ErrorCategory::User
    }

    /// Describe the operation that failed, such as "failed to decrypt", and
    /// keep `self` as the source. Category and kind are inherited so a wrong
    /// password still reads as `FingerprintMismatch` after wrapping.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self::build(category, kind, msg, Some(Box::new(self)))
    }

    pub(crate) fn authentication_failed() -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "cipher: message authentication failed",
        )
    }

    pub(crate) fn ciphertext_too_short(size: usize, minimum: usize) -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::CiphertextTooShort { size, minimum },
            format!(
                "cipherText is too short: textsize=[{}], noncesize=[{}]",
                size, minimum
            ),
        )
    }

    pub(crate) fn invalid_key_size(size: usize) -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::Backend,
            format!("invalid key size {}", size),
        )
    }
}

pub type Result<T> = std::result::Result<T, HierogolyphError>;

//! Password hashers used to derive the envelope digest pair
//!
//! A [`Hasher`] is a deterministic function of `(subject, context)` whose
//! output length is chosen per call. The envelope engine calls it twice per
//! unlock, once as `(password, salt)` and once as `(salt, password)`.
//!
//! Zero-valued parameters fall back to the defaults of each algorithm, so
//! `Argon2::default()` and friends are ready to use. `is_weak` reports
//! parameters below those defaults; the config loader warns about them once.

use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2s256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512, Sha512_256};
use sha3::Sha3_256;

/// Deterministic password hashing with a caller-chosen output length.
pub trait Hasher: Send + Sync {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>>;
}

fn backend_error(algorithm: &str, detail: impl std::fmt::Display) -> HierogolyphError {
    HierogolyphError::with_kind(
        ErrorCategory::User,
        ErrorKind::Backend,
        format!("{} hashing failed: {}", algorithm, detail),
    )
}

const DEFAULT_ARGON2_TIME: u32 = 1;
const DEFAULT_ARGON2_MEMORY: u32 = 64 * 1024;
const DEFAULT_ARGON2_THREADS: u32 = 4;

/// Argon2id (version 0x13).
///
/// `memory` is in KiB. The context is hashed with SHA-256 before being used
/// as the Argon2 salt, which lifts the algorithm's 8-byte minimum salt length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Argon2 {
    pub time: u32,
    pub memory: u32,
    pub threads: u32,
}

impl Argon2 {
    fn time(&self) -> u32 {
        if self.time == 0 {
            DEFAULT_ARGON2_TIME
        } else {
            self.time
        }
    }

    fn memory(&self) -> u32 {
        if self.memory == 0 {
            DEFAULT_ARGON2_MEMORY
        } else {
            self.memory
        }
    }

    fn threads(&self) -> u32 {
        if self.threads == 0 {
            DEFAULT_ARGON2_THREADS
        } else {
            self.threads
        }
    }

    pub fn is_weak(&self) -> bool {
        self.memory() < DEFAULT_ARGON2_MEMORY
    }
}

impl Hasher for Argon2 {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        let params = argon2::Params::new(
            self.memory(),
            self.time(),
            self.threads(),
            Some(output_len),
        )
        .map_err(|e| backend_error("argon2", e))?;
        let argon =
            argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let salt = Sha256::digest(context);
        let mut output = vec![0u8; output_len];
        argon
            .hash_password_into(subject, &salt, &mut output)
            .map_err(|e| backend_error("argon2", e))?;
        Ok(output)
    }
}

const DEFAULT_SCRYPT_COST: u32 = 32768;
const DEFAULT_SCRYPT_BLOCK_SIZE: u32 = 8;
const DEFAULT_SCRYPT_PARALLELISM: u32 = 1;

/// scrypt with cost `N` (a power of two), block size `r` and parallelism `p`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scrypt {
    pub cost: u32,
    pub block_size: u32,
    pub parallelism: u32,
}

impl Scrypt {
    fn cost(&self) -> u32 {
        if self.cost == 0 {
            DEFAULT_SCRYPT_COST
        } else {
            self.cost
        }
    }

    fn block_size(&self) -> u32 {
        if self.block_size == 0 {
            DEFAULT_SCRYPT_BLOCK_SIZE
        } else {
            self.block_size
        }
    }

    fn parallelism(&self) -> u32 {
        if self.parallelism == 0 {
            DEFAULT_SCRYPT_PARALLELISM
        } else {
            self.parallelism
        }
    }

    pub fn is_weak(&self) -> bool {
        self.cost() < DEFAULT_SCRYPT_COST
    }
}

impl Hasher for Scrypt {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        let cost = self.cost();
        if cost < 2 || !cost.is_power_of_two() {
            return Err(backend_error(
                "scrypt",
                format!("cost must be a power of two greater than 1, got {}", cost),
            ));
        }
        let log_n = cost.trailing_zeros() as u8;
        let params = scrypt::Params::new(
            log_n,
            self.block_size(),
            self.parallelism(),
            scrypt::Params::RECOMMENDED_LEN,
        )
        .map_err(|e| backend_error("scrypt", e))?;

        let mut output = vec![0u8; output_len];
        scrypt::scrypt(subject, context, &params, &mut output)
            .map_err(|e| backend_error("scrypt", e))?;
        Ok(output)
    }
}

const DEFAULT_PBKDF2_ITERATIONS: u32 = 4096;

/// PBKDF2-HMAC-SHA512.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Pbkdf2 {
    pub iterations: u32,
}

impl Pbkdf2 {
    fn iterations(&self) -> u32 {
        if self.iterations == 0 {
            DEFAULT_PBKDF2_ITERATIONS
        } else {
            self.iterations
        }
    }

    pub fn is_weak(&self) -> bool {
        self.iterations() < DEFAULT_PBKDF2_ITERATIONS
    }
}

impl Hasher for Pbkdf2 {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        let mut output = vec![0u8; output_len];
        pbkdf2::pbkdf2_hmac::<Sha512>(subject, context, self.iterations(), &mut output);
        Ok(output)
    }
}

const DEFAULT_BALLOON_SPACE_COST: u32 = 16;
const DEFAULT_BALLOON_TIME_COST: u32 = 16;
const DEFAULT_BALLOON_PARALLELISM: u32 = 1;

/// Balloon-M over SHA-512. Space cost is in 64-byte blocks per thread.
///
/// Output is at most 64 bytes, the SHA-512 digest size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Balloon {
    pub space_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Balloon {
    fn space_cost(&self) -> u32 {
        if self.space_cost == 0 {
            DEFAULT_BALLOON_SPACE_COST
        } else {
            self.space_cost
        }
    }

    fn time_cost(&self) -> u32 {
        if self.time_cost == 0 {
            DEFAULT_BALLOON_TIME_COST
        } else {
            self.time_cost
        }
    }

    fn parallelism(&self) -> u32 {
        if self.parallelism == 0 {
            DEFAULT_BALLOON_PARALLELISM
        } else {
            self.parallelism
        }
    }

    pub fn is_weak(&self) -> bool {
        self.space_cost() < DEFAULT_BALLOON_SPACE_COST
            || self.time_cost() < DEFAULT_BALLOON_TIME_COST
    }
}

impl Hasher for Balloon {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        let params =
            balloon_hash::Params::new(self.space_cost(), self.time_cost(), self.parallelism())
                .map_err(|e| backend_error("balloon", e))?;
        let balloon = balloon_hash::Balloon::<Sha512>::new(
            balloon_hash::Algorithm::BalloonM,
            params,
            None,
        );
        let digest = balloon
            .hash(subject, context)
            .map_err(|e| backend_error("balloon", e))?;
        truncate_output("balloon", &digest, output_len)
    }
}

fn truncate_output(algorithm: &str, digest: &[u8], output_len: usize) -> Result<Vec<u8>> {
    if output_len > digest.len() {
        return Err(backend_error(
            algorithm,
            format!(
                "output length {} exceeds digest size {}",
                output_len,
                digest.len()
            ),
        ));
    }
    Ok(digest[..output_len].to_vec())
}

fn truncated_digest<D: Digest>(
    subject: &[u8],
    context: &[u8],
    output_len: usize,
) -> Result<Vec<u8>> {
    let digest = D::new().chain_update(subject).chain_update(context).finalize();
    truncate_output("digest", &digest, output_len)
}

/// Plain SHA-256 of `subject || context`. Not a password hash; for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureSha256;

impl Hasher for InsecureSha256 {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        truncated_digest::<Sha256>(subject, context, output_len)
    }
}

/// Plain SHA-512/256 of `subject || context`. Not a password hash; for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureSha512;

impl Hasher for InsecureSha512 {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        truncated_digest::<Sha512_256>(subject, context, output_len)
    }
}

/// Plain BLAKE2b-256 of `subject || context`. Not a password hash; for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureBlake2b;

impl Hasher for InsecureBlake2b {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        truncated_digest::<Blake2b<U32>>(subject, context, output_len)
    }
}

/// Plain BLAKE2s-256 of `subject || context`. Not a password hash; for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureBlake2s;

impl Hasher for InsecureBlake2s {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        truncated_digest::<Blake2s256>(subject, context, output_len)
    }
}

/// Plain SHA3-256 of `subject || context`. Not a password hash; for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureSha3;

impl Hasher for InsecureSha3 {
    fn hash(&self, subject: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        truncated_digest::<Sha3_256>(subject, context, output_len)
    }
}

//! File level operations used by the command line tool
//!
//! An envelope record (salt and wrapped-key token) is kept as JSON next to
//! the encrypted files. Encrypted files hold a single ciphertext envelope as
//! ASCII text. Everything written here gets mode 0o600 on Unix systems.

use crate::config::Config;
use crate::envelope::{EnvelopeRecord, Hierogolyph};
use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use crate::password::PasswordReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Create a fresh salt and token and store them at `record_path`.
///
/// Refuses to overwrite an existing record, since every file encrypted under
/// it would become undecryptable without its salt.
pub fn init_record(
    record_path: &Path,
    config: &Config,
    password_reader: &mut dyn PasswordReader,
) -> Result<EnvelopeRecord> {
    // Checked again when the file is created; this only avoids a prompt.
    if record_path.exists() {
        return Err(record_exists(record_path, None));
    }
    let password = password_reader.read_password()?;
    let envelope = Hierogolyph::create(&*password, config.clone())
        .map_err(|e| e.with_context("failed to create encryption key"))?;
    let record = envelope.record();
    write_record(record_path, &record)?;
    info!(record = %record_path.display(), "created envelope record");
    Ok(record)
}

/// Encrypt `input_path` into `output_path` using the record at `record_path`.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    record_path: &Path,
    config: &Config,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let record = read_record(record_path)?;
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let password = password_reader.read_password()?;
    let envelope = Hierogolyph::from_record(&*password, record, config.clone());
    let ciphertext = envelope
        .encrypt(&plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, ciphertext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    debug!(output = %output_path.display(), "encrypted file");
    Ok(())
}

/// Decrypt `input_path` into `output_path`.
///
/// Only the salt is taken from the record; the token comes from the
/// ciphertext itself.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    record_path: &Path,
    config: &Config,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let record = read_record(record_path)?;
    let ciphertext = read_ciphertext(input_path)?;
    let password = password_reader.read_password()?;
    let envelope = Hierogolyph::new(&*password, record.salt, config.clone());
    let plaintext = envelope
        .decrypt(ciphertext.trim_end())
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    debug!(output = %output_path.display(), "decrypted file");
    Ok(())
}

/// Replace the encrypted file at `crypt_path` with an encryption of `plain_path`.
///
/// The existing file is decrypted first so that a mistyped password cannot
/// silently produce a file nobody can open. The new file is written to a
/// temporary file, synced and renamed over the old one, so either the old or
/// the new ciphertext exists at all times.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    record_path: &Path,
    config: &Config,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let record = read_record(record_path)?;
    let old_ciphertext = read_ciphertext(crypt_path)?;
    let password = password_reader.read_password()?;
    let envelope = Hierogolyph::from_record(&*password, record, config.clone());

    envelope
        .decrypt(old_ciphertext.trim_end())
        .map_err(|e| e.with_context("failed to decrypt"))?;

    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_ciphertext = envelope
        .encrypt(&new_plaintext)
        .map_err(|e| e.with_context("failed to encrypt"))?;
    write_file_atomic(crypt_path, new_ciphertext.as_bytes())?;
    debug!(output = %crypt_path.display(), "updated file");
    Ok(())
}

pub fn read_record(path: &Path) -> Result<EnvelopeRecord> {
    let contents = fs::read(path).map_err(|e| read_error(path, e))?;
    serde_json::from_slice(&contents).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidEncoding,
            format!("invalid envelope record {}: {}", path.display(), e),
            e,
        )
    })
}

/// Store `record` at `path`, failing if anything already exists there.
pub fn write_record(path: &Path, record: &EnvelopeRecord) -> Result<()> {
    let mut json = serde_json::to_string_pretty(record).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to serialize envelope record",
            e,
        )
    })?;
    json.push('\n');
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = open_secure(path, &mut options).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            record_exists(path, Some(e))
        } else {
            io_error(
                ErrorCategory::User,
                format!("failed to create {}", path.display()),
                e,
            )
        }
    })?;
    file.write_all(json.as_bytes()).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to write to {}", path.display()),
            e,
        )
    })
}

fn record_exists(path: &Path, err: Option<io::Error>) -> HierogolyphError {
    let msg = format!("record {} already exists", path.display());
    match err {
        Some(err) => io_error(ErrorCategory::User, msg, err),
        None => HierogolyphError::with_kind(ErrorCategory::User, ErrorKind::Io, msg),
    }
}

fn read_ciphertext(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        HierogolyphError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidEncoding,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> HierogolyphError {
    HierogolyphError::with_kind_and_source(category, ErrorKind::Io, msg, err)
}

/// Write `contents` to `path` through a synced temporary file in the same
/// directory, then rename it into place.
fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to create tempfile", e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // The rename below must only ever point at a complete file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                io_error(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", path.display()),
            e.error,
        )
    })?;
    Ok(())
}

/// Write file with mode 0o600 on Unix
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    let mut file = open_secure(path, &mut options).map_err(|e| {
        io_error(
            ErrorCategory::User,
            format!("failed to open {}", path.display()),
            e,
        )
    })?;
    file.write_all(contents).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to write {}", path.display()),
            e,
        )
    })
}

fn open_secure(path: &Path, options: &mut fs::OpenOptions) -> io::Result<fs::File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn read_error(path: &Path, err: io::Error) -> HierogolyphError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    io_error(
        category,
        format!("failed to read from {}", path.display()),
        err,
    )
}

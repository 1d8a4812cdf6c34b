//! Password input for the command line tool

use crate::error::{ErrorCategory, ErrorKind, HierogolyphError, Result};
use std::io::{self, IsTerminal, Read, Write};
use tracing::debug;
use zeroize::Zeroizing;

/// Source of the envelope password.
pub trait PasswordReader {
    /// Read the password as arbitrary bytes (not necessarily UTF-8).
    ///
    /// The result is wrapped in `Zeroizing` so it is wiped when dropped.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password (for testing)
pub struct ConstantPasswordReader {
    password: Zeroizing<Vec<u8>>,
}

impl ConstantPasswordReader {
    pub fn new(password: impl AsRef<[u8]>) -> Self {
        Self {
            password: Zeroizing::new(password.as_ref().to_vec()),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.password.clone())
    }
}

/// Reads the password from any `io::Read` until EOF.
///
/// A single trailing `\n` or `\r\n` is dropped so that `echo secret |` and a
/// file saved by an editor give the same password as the terminal prompt.
pub struct StreamPasswordReader {
    reader: Box<dyn Read>,
}

impl StreamPasswordReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordReader for StreamPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            HierogolyphError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        if data.ends_with(b"\n") {
            data.pop();
            if data.ends_with(b"\r") {
                data.pop();
            }
        }
        debug!(len = data.len(), "read password from stream");
        Ok(data)
    }
}

/// Prompts on stderr and reads the password from the terminal with no echo.
pub struct TerminalPasswordReader {
    confirm: bool,
}

impl TerminalPasswordReader {
    pub fn new() -> Self {
        Self { confirm: false }
    }

    /// Ask twice and fail if the two entries differ.
    pub fn with_confirmation() -> Self {
        Self { confirm: true }
    }

    fn prompt(text: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mut stderr = io::stderr();
        stderr
            .write_all(text.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                HierogolyphError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // rpassword hands back a plain String; move it into a zeroizing buffer right away.
        let password = rpassword::read_password().map_err(|e| {
            HierogolyphError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(password.into_bytes()))
    }
}

impl Default for TerminalPasswordReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordReader for TerminalPasswordReader {
    /// Terminal input is limited to UTF-8; use `--password-stdin` for
    /// arbitrary bytes.
    fn read_password(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(HierogolyphError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        let password = Self::prompt("Password (hierogolyph): ")?;
        if self.confirm {
            let again = Self::prompt("Confirm password (hierogolyph): ")?;
            if *again != *password {
                return Err(HierogolyphError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::PasswordUnavailable,
                    "passwords do not match",
                ));
            }
        }
        Ok(password)
    }
}

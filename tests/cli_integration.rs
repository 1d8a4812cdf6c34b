//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

/// Run hierogolyph against the test config and `record`, with the password on stdin
fn run_hierogolyph(record: &Path, args: &[&str], password: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hierogolyph"))
        .arg("--password-stdin")
        .arg("--config")
        .arg(testdata_path("config.toml"))
        .arg("--record")
        .arg(record)
        .args(args)
        .env_remove("HIEROGOLYPH_CONFIG")
        .env_remove("HIEROGOLYPH_RECORD")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn hierogolyph");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // The command may exit before reading stdin (e.g. file not found).
        let _ = stdin.write_all(password.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for hierogolyph")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init(temp_dir: &TempDir, password: &str) -> PathBuf {
    let record = temp_dir.path().join("record.json");
    let output = run_hierogolyph(&record, &["init"], password);
    assert_success(&output, "init");
    assert!(record.exists());
    record
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Decrypt known ciphertext.
#[test]
fn test_decrypt_known_ciphertext() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("hello-decrypted.txt");

    let result = run_hierogolyph(
        &testdata_path("hello-record.json"),
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt.hgl")),
            "-o",
            path_str(&output),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(&output).unwrap();
    let expected = fs::read_to_string(testdata_path("hello.txt")).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_trailing_newline_in_password_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("hello-decrypted.txt");

    let result = run_hierogolyph(
        &testdata_path("hello-record.json"),
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt.hgl")),
            "-o",
            path_str(&output),
        ],
        "test\n",
    );
    assert_success(&result, "decrypt");
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let record = init(&temp_dir, "test");
    let plaintext_path = testdata_path("hello.txt");
    let encrypted_path = temp_dir.path().join("hello.txt.hgl");
    let decrypted_path = temp_dir.path().join("hello-decrypted.txt");

    let result = run_hierogolyph(
        &record,
        &[
            "encrypt",
            "-i",
            path_str(&plaintext_path),
            "-o",
            path_str(&encrypted_path),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let result = run_hierogolyph(
        &record,
        &[
            "decrypt",
            "-i",
            path_str(&encrypted_path),
            "-o",
            path_str(&decrypted_path),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let original = fs::read_to_string(&plaintext_path).unwrap();
    let decrypted = fs::read_to_string(&decrypted_path).unwrap();
    assert_eq!(original, decrypted);
}

#[test]
fn test_init_refuses_existing_record() {
    let temp_dir = TempDir::new().unwrap();
    let record = init(&temp_dir, "test");

    let result = run_hierogolyph(&record, &["init"], "test");
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.starts_with("Error: record "), "got: {}", stderr);
    assert!(stderr.contains("already exists"), "got: {}", stderr);
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let record = init(&temp_dir, "test");
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.hgl");
    let decrypted = temp_dir.path().join("decrypted.txt");

    fs::write(&plaintext1, "Original content").unwrap();
    let result = run_hierogolyph(
        &record,
        &[
            "encrypt",
            "-i",
            path_str(&plaintext1),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    fs::write(&plaintext2, "Updated content").unwrap();
    let result = run_hierogolyph(
        &record,
        &[
            "update",
            "-i",
            path_str(&plaintext2),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "update");

    let result = run_hierogolyph(
        &record,
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read_to_string(&decrypted).unwrap(), "Updated content");
}

#[test]
fn test_update_with_wrong_password_fails() {
    let temp_dir = TempDir::new().unwrap();
    let record = init(&temp_dir, "correct_password");
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.hgl");

    fs::write(&plaintext1, "Original").unwrap();
    let result = run_hierogolyph(
        &record,
        &[
            "encrypt",
            "-i",
            path_str(&plaintext1),
            "-o",
            path_str(&encrypted),
        ],
        "correct_password",
    );
    assert_success(&result, "encrypt");
    let before = fs::read(&encrypted).unwrap();

    fs::write(&plaintext2, "Updated").unwrap();
    let result = run_hierogolyph(
        &record,
        &[
            "update",
            "-i",
            path_str(&plaintext2),
            "-o",
            path_str(&encrypted),
        ],
        "wrong_password",
    );

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("failed to decrypt") && stderr.contains("HMAC finger print error"),
        "Expected error message about decryption, got: {}",
        stderr
    );
    assert_eq!(fs::read(&encrypted).unwrap(), before);
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.hgl");
    let output = temp_dir.path().join("output.txt");

    let result = run_hierogolyph(
        &testdata_path("hello-record.json"),
        &[
            "decrypt",
            "-i",
            path_str(&nonexistent),
            "-o",
            path_str(&output),
        ],
        "test",
    );

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = Command::new(env!("CARGO_BIN_EXE_hierogolyph"))
        .arg("--password-stdin")
        .arg("--config")
        .arg(temp_dir.path().join("missing.toml"))
        .arg("--record")
        .arg(temp_dir.path().join("record.json"))
        .arg("init")
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("failed to read config"), "got: {}", stderr);
    assert!(!temp_dir.path().join("record.json").exists());
}

#[test]
fn test_empty_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let record = init(&temp_dir, "test");
    let plaintext = temp_dir.path().join("empty.txt");
    let encrypted = temp_dir.path().join("empty.txt.hgl");
    let decrypted = temp_dir.path().join("empty-decrypted.txt");

    fs::write(&plaintext, b"").unwrap();

    let result = run_hierogolyph(
        &record,
        &[
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let result = run_hierogolyph(
        &record,
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read(&decrypted).unwrap(), b"");
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let record = init(&temp_dir, "test");
    let plaintext = temp_dir.path().join("large.txt");
    let encrypted = temp_dir.path().join("large.txt.hgl");
    let decrypted = temp_dir.path().join("large-decrypted.txt");

    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&plaintext, &large_content).unwrap();

    let result = run_hierogolyph(
        &record,
        &[
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let result = run_hierogolyph(
        &record,
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read(&decrypted).unwrap(), large_content);
}

//! End-to-end properties of the envelope protocol

use hierogolyph::envelope::unlock_token;
use hierogolyph::{
    AesGcmCipher, Argon2, Balloon, ChaCha20Poly1305Cipher, Config, ErrorKind, Hierogolyph,
    InsecureBlake2b, InsecureBlake2s, InsecureSha3, InsecureSha256, MockAesGcmKms,
    MockChaCha20Kms, XSalsa20Poly1305Cipher, random,
};

const TEST_HMAC_KEY: &[u8] = br#"nzgz8CX^aB9v:^{iOp[F}>|%h_116]^"m*=v&O4mpA?S_W)\BN]%]_o>hl$1Y^Sb"#;
const TEST_GCM_KEY: &[u8] = br"PD02lR@Wb^P/PFh$E79v5aWu{W,Ap\e;";

fn test_config() -> Config {
    Config::new(
        AesGcmCipher,
        MockAesGcmKms::new(TEST_GCM_KEY),
        InsecureSha256,
        TEST_HMAC_KEY,
    )
}

/// Encrypt with a fresh instance, then decrypt with an instance that only
/// knows the password and salt.
fn assert_roundtrip(config: &Config, password: &str, plaintext: &[u8]) {
    let h = Hierogolyph::create(password, config.clone()).unwrap();
    let ciphertext = h.encrypt(plaintext).unwrap();
    assert_eq!(ciphertext.matches('.').count(), 1);

    let h2 = Hierogolyph::new(password, h.salt(), config.clone());
    assert_eq!(h2.decrypt(&ciphertext).unwrap(), plaintext);
}

#[test]
fn test_roundtrip() {
    let tests: &[(&str, &str)] = &[
        ("password", "secretText"),
        ("password", "secretText2"),
        ("", "secretText"),
        ("it's my secret", "secretText"),
        ("あいうえお", "いろはにほへと"),
        ("password", ""),
        (
            "jsos data password",
            r#"{
                "error": "Expected a ',' or '}' at 15 [character 16 line 1]",
                "object_or_array": "object",
                "validate": false
            }"#,
        ),
    ];
    let config = test_config();
    for (password, secret) in tests {
        assert_roundtrip(&config, password, secret.as_bytes());
    }
}

#[test]
fn test_roundtrip_all_adapters() {
    let configs = [
        test_config(),
        test_config().with_cipher(ChaCha20Poly1305Cipher),
        test_config().with_cipher(XSalsa20Poly1305Cipher),
        test_config().with_kms(MockChaCha20Kms::new(TEST_GCM_KEY)),
        test_config().with_kms(MockAesGcmKms::new(&TEST_GCM_KEY[..16])),
        test_config().with_kms(MockAesGcmKms::new(&TEST_GCM_KEY[..24])),
        test_config().with_hasher(Argon2 {
            time: 1,
            memory: 1024,
            threads: 1,
        }),
        test_config().with_hasher(Balloon::default()),
        test_config().with_hasher(InsecureSha3),
        test_config().with_hasher(InsecureBlake2b),
        test_config().with_hasher(InsecureBlake2s),
    ];
    for config in &configs {
        assert_roundtrip(config, "password", b"secretText");
    }
}

#[test]
fn test_roundtrip_binary() {
    let data = random::random_bytes(64 * 1024).unwrap();
    assert_roundtrip(&test_config(), "password 64KB", &data);
}

#[test]
#[ignore]
fn test_roundtrip_big_data() {
    for size in [1024 * 1024, 10 * 1024 * 1024] {
        let data = random::random_bytes(size).unwrap();
        assert_roundtrip(&test_config(), "password big data", &data);
    }
}

#[test]
fn test_reencryption_keeps_old_ciphertexts_readable() {
    let config = test_config();
    let mut h = Hierogolyph::create("password", config.clone()).unwrap();
    let first = h.encrypt(b"first").unwrap();
    let first_key = h.encryption_key().to_string();

    h.set_encryption_key().unwrap();
    assert_ne!(h.encryption_key(), first_key);
    let second = h.encrypt(b"second").unwrap();

    let reader = Hierogolyph::new("password", h.salt(), config);
    assert_eq!(reader.decrypt(&first).unwrap(), b"first");
    assert_eq!(reader.decrypt(&second).unwrap(), b"second");
}

#[test]
fn test_same_plaintext_gives_different_ciphertexts() {
    let h = Hierogolyph::create("password", test_config()).unwrap();
    assert_ne!(h.encrypt(b"secret").unwrap(), h.encrypt(b"secret").unwrap());
}

#[test]
fn test_different_hmac_key() {
    let h = Hierogolyph::create("password", test_config()).unwrap();
    let ciphertext = h.encrypt(b"secretText").unwrap();

    let other = Hierogolyph::new(
        "password",
        h.salt(),
        test_config().with_hmac_key(b"another hmac key"),
    );
    let err = other.decrypt(&ciphertext).expect_err("expected fingerprint error");
    assert_eq!(err.kind, Some(ErrorKind::FingerprintMismatch));
    assert!(err.to_string().starts_with("HMAC finger print error:"));
}

#[test]
fn test_different_kms_key() {
    let h = Hierogolyph::create("password", test_config()).unwrap();
    let ciphertext = h.encrypt(b"secretText").unwrap();

    let other = Hierogolyph::new(
        "password",
        h.salt(),
        test_config().with_kms(MockAesGcmKms::new(b"12345678901234567890123456789012")),
    );
    let err = other.decrypt(&ciphertext).expect_err("expected kms error");
    assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    assert_eq!(err.to_string(), "cipher: message authentication failed");
}

#[test]
fn test_different_password_or_salt() {
    let h = Hierogolyph::create("password", test_config()).unwrap();
    let ciphertext = h.encrypt(b"secretText").unwrap();

    for (password, salt) in [("password2", h.salt()), ("password", "salt")] {
        let other = Hierogolyph::new(password, salt, test_config());
        let err = other.decrypt(&ciphertext).expect_err("expected fingerprint error");
        assert_eq!(err.kind, Some(ErrorKind::FingerprintMismatch));
    }
}

#[test]
fn test_empty_kms_key() {
    let config = test_config().with_kms(MockAesGcmKms::new(b""));
    let err = Hierogolyph::create("password", config).expect_err("expected key error");
    assert_eq!(err.kind, Some(ErrorKind::Backend));
    assert_eq!(err.to_string(), "invalid key size 0");
}

#[test]
fn test_malformed_envelopes() {
    let h = Hierogolyph::create("password", test_config()).unwrap();

    for input in ["", "abcde", "a.b.c", "..", "abc."] {
        let err = h.decrypt(input).expect_err("expected malformed envelope");
        if input.matches('.').count() == 1 {
            assert_eq!(err.kind, Some(ErrorKind::InvalidEncoding), "{:?}", input);
        } else {
            assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope), "{:?}", input);
            assert_eq!(
                err.to_string(),
                format!("cipherText=[{}] must have one dot `.`", input)
            );
        }
    }

    let err = h.decrypt("a.b").expect_err("expected base64 error");
    assert_eq!(err.kind, Some(ErrorKind::InvalidEncoding));

    let err = h.decrypt(".").expect_err("expected short token");
    assert_eq!(
        err.kind,
        Some(ErrorKind::CiphertextTooShort {
            size: 0,
            minimum: 12
        })
    );
    assert_eq!(
        err.to_string(),
        "cipherText is too short: textsize=[0], noncesize=[12]"
    );
}

#[test]
fn test_unlock_token_is_pure() {
    let config = test_config();
    let h = Hierogolyph::create("password", config.clone()).unwrap();
    let from_instance = h.unlock().unwrap();
    let from_token =
        unlock_token(b"password", h.salt(), h.encryption_key(), &config).unwrap();
    assert_eq!(*from_instance, *from_token);
}

#[test]
fn test_shared_across_threads() {
    let h = std::sync::Arc::new(Hierogolyph::create("password", test_config()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let h = h.clone();
            std::thread::spawn(move || {
                let message = format!("message {}", i);
                let ciphertext = h.encrypt(message.as_bytes()).unwrap();
                assert_eq!(h.decrypt(&ciphertext).unwrap(), message.as_bytes());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

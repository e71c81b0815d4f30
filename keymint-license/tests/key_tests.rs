mod common;

use common::test_keypair;
use keymint_license::{
    EMBEDDED_PUBLIC_KEY, KeyPair, KeyStore, LicenseError, PublicKeyCoordinates, load_public_key,
};
use pretty_assertions::assert_eq;

// ── KeyPair ──────────────────────────────────────────────────────

#[test]
fn generated_keys_differ() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    assert_ne!(a.public_key(), b.public_key());
}

#[test]
fn public_key_has_named_coordinates() {
    let key = test_keypair().public_key();
    assert_eq!(key.kty, "EC");
    assert_eq!(key.crv, "P-256");
    assert_eq!(key.x.len(), 43);
    assert_eq!(key.y.len(), 43);
}

#[test]
fn public_key_json_layout() {
    let key = test_keypair().public_key();
    let value = serde_json::to_value(&key).unwrap();
    let obj = value.as_object().unwrap();
    let mut fields: Vec<&str> = obj.keys().map(String::as_str).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["crv", "kty", "x", "y"]);
}

#[test]
fn coordinates_decode_to_same_key() {
    let pair = test_keypair();
    let decoded = pair.public_key().to_verifying_key().unwrap();
    assert_eq!(&decoded, pair.verifying_key());
}

#[test]
fn zero_scalar_rejected() {
    assert!(matches!(
        KeyPair::from_secret_bytes(&[0u8; 32]),
        Err(LicenseError::Key(_))
    ));
}

#[test]
fn private_jwk_roundtrip_keeps_key() {
    let pair = test_keypair();
    let jwk = pair.to_private_jwk().unwrap();
    assert!(jwk.contains("\"d\""));
    let restored = KeyPair::from_private_jwk(&jwk).unwrap();
    assert_eq!(restored.public_key(), pair.public_key());
}

#[test]
fn private_jwk_with_foreign_coordinates_rejected() {
    let pair = test_keypair();
    let other = KeyPair::generate().public_key();
    let mut value: serde_json::Value = serde_json::from_str(&pair.to_private_jwk().unwrap()).unwrap();
    value["x"] = serde_json::Value::String(other.x.into_owned());
    let result = KeyPair::from_private_jwk(&value.to_string());
    assert!(matches!(result, Err(LicenseError::Key(_))));
}

#[test]
fn debug_redacts_private_key() {
    let debug = format!("{:?}", test_keypair());
    assert!(debug.contains("REDACTED"));
}

// ── PublicKeyCoordinates ─────────────────────────────────────────

#[test]
fn embedded_key_is_on_curve() {
    assert!(EMBEDDED_PUBLIC_KEY.to_verifying_key().is_ok());
}

#[test]
fn wrong_curve_rejected() {
    let mut key = test_keypair().public_key();
    key.crv = "P-384".into();
    assert!(matches!(key.to_verifying_key(), Err(LicenseError::Key(_))));
}

#[test]
fn short_coordinate_rejected() {
    let mut key = test_keypair().public_key();
    key.x = "AAAA".into();
    assert!(matches!(key.to_verifying_key(), Err(LicenseError::Key(_))));
}

#[test]
fn point_off_curve_rejected() {
    let mut key = test_keypair().public_key();
    key.y = key.x.clone();
    assert!(key.to_verifying_key().is_err());
}

#[test]
fn rust_const_snippet_embeds_coordinates() {
    let key = test_keypair().public_key();
    let snippet = key.to_rust_const("LICENSE_PUBLIC_KEY");
    assert!(snippet.starts_with("pub const LICENSE_PUBLIC_KEY: PublicKeyCoordinates"));
    assert!(snippet.contains(&*key.x));
    assert!(snippet.contains(&*key.y));
}

#[test]
fn embedded_constructor_matches_decoded() {
    let key = test_keypair().public_key();
    let x: &'static str = Box::leak(key.x.to_string().into_boxed_str());
    let y: &'static str = Box::leak(key.y.to_string().into_boxed_str());
    assert_eq!(PublicKeyCoordinates::embedded(x, y), key);
}

// ── KeyStore ─────────────────────────────────────────────────────

#[test]
fn generate_writes_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path());
    assert!(!store.exists());

    let pair = store.generate().unwrap();

    assert!(store.private_key_path().exists());
    assert!(store.public_key_path().exists());
    assert_eq!(store.load_public_key().unwrap(), pair.public_key());
    assert_eq!(store.load_key_pair().unwrap().public_key(), pair.public_key());
}

#[test]
fn generate_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path());
    let first = store.generate().unwrap();

    let err = store.generate().unwrap_err();
    assert!(matches!(err, LicenseError::KeyConflict(_)));
    assert_eq!(store.load_key_pair().unwrap().public_key(), first.public_key());
}

#[test]
fn generate_refuses_when_only_public_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path());
    std::fs::write(store.public_key_path(), "{}").unwrap();

    assert!(matches!(store.generate(), Err(LicenseError::KeyConflict(_))));
    assert!(!store.private_key_path().exists());
}

#[test]
fn generate_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path().join("vendor/keys"));
    store.generate().unwrap();
    assert!(store.exists());
}

#[test]
fn load_missing_key_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = KeyStore::new(dir.path());
    assert!(matches!(store.load_key_pair(), Err(LicenseError::Io(_))));
}

#[test]
fn load_garbage_public_key_is_key_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pub.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(load_public_key(&path), Err(LicenseError::Key(_))));
}

//! Shared test helpers for license tests.

#![allow(dead_code)]

use keymint_license::{
    IssueOptions, KeyPair, LicenseArtifact, LicenseIssuer, LicenseValidator, StaticFingerprint,
    Timestamp,
};

/// 2026-10-16T12:00:00Z.
pub const NOW: Timestamp = Timestamp::from_micros(1_792_152_000_000_000);

/// Fingerprint reported by the test device.
pub const DEVICE_A: &str = "device-A";

/// Returns a deterministic keypair from a fixed scalar.
pub fn test_keypair() -> KeyPair {
    let scalar: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    KeyPair::from_secret_bytes(&scalar).unwrap()
}

/// Issuer signing with [`test_keypair`].
pub fn test_issuer() -> LicenseIssuer {
    LicenseIssuer::new(test_keypair())
}

/// Validator trusting [`test_keypair`] on a device reporting `fingerprint`.
pub fn validator_on(fingerprint: &str) -> LicenseValidator<StaticFingerprint> {
    LicenseValidator::new(&test_keypair().public_key(), StaticFingerprint::new(fingerprint))
        .unwrap()
}

/// Issues a license at [`NOW`].
pub fn issue(options: IssueOptions) -> LicenseArtifact {
    test_issuer().issue(options, NOW).unwrap()
}

/// Re-serializes an artifact after editing its JSON, without re-signing.
pub fn tamper(artifact: &LicenseArtifact, edit: impl FnOnce(&mut serde_json::Value)) -> String {
    let mut value: serde_json::Value =
        serde_json::from_str(&artifact.to_json_pretty().unwrap()).unwrap();
    edit(&mut value);
    serde_json::to_string_pretty(&value).unwrap()
}

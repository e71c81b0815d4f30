//! Offline licensing for keymint.
//!
//! This crate handles:
//! - Vendor keypair generation and public key export (ECDSA P-256)
//! - License issuance: canonical claims signed with the vendor key
//! - Offline validation: signature, expiry and device binding
//! - Daily usage limiting with a locally persisted counter
//!
//! # Design Principles
//!
//! - **No network**: validation needs only the artifact, the embedded public
//!   key, the clock and the device fingerprint
//! - **Signature first**: no claim is looked at before the signature verifies
//! - **Fail closed**: a rejected license downgrades the host, and an
//!   unreadable usage counter denies the limited action
//!
//! # License Artifact Format
//!
//! A JSON file `{ "claims": {...}, "signature": "<base64>" }` where the
//! signature covers the compact canonical JSON of `claims`.

mod artifact;
mod claims;
mod device;
mod error;
mod fsutil;
mod issuer;
mod keys;
mod store;
mod usage;
mod validator;

pub use artifact::{LicenseArtifact, SIGNATURE_LEN};
pub use claims::{LicenseClaims, Quota, UNLIMITED_EXPORTS};
pub use device::{DeviceInfo, FingerprintProvider, HostFingerprint, StaticFingerprint};
pub use error::{LicenseError, LicenseResult};
pub use issuer::{IssueMode, IssueOptions, IssuedLicense, LicenseIssuer, artifact_file_name};
pub use keys::{
    CURVE, KEY_TYPE, KeyPair, KeyStore, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, PublicKeyCoordinates,
    load_public_key,
};
pub use store::{DATA_DIR_ENV, LicensePaths, LicenseStore};
pub use usage::{
    DenyReason, FileUsageStore, MemoryUsageStore, UsageDecision, UsageLimiter, UsageRecord,
    UsageStore,
};
pub use validator::{
    EMBEDDED_PUBLIC_KEY, LicenseStatus, LicenseValidator, SignatureFailure, ValidatedLicense,
    validate_json, verify_artifact,
};

pub use keymint_types::{Timestamp, UserId};

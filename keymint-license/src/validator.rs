//! Offline license validation.
//!
//! Validation is a pure function of the artifact, the public key, the
//! current time and the current device fingerprint. Checks run in a fixed
//! order and stop at the first failure:
//!
//! 1. signature over the canonical claims (nothing else is read before this passes)
//! 2. expiry (`expiresAt` must be strictly after now)
//! 3. device binding (byte-exact fingerprint match)
//!
//! The result is a [`LicenseStatus`] value; validation never panics and never
//! returns an error, so a bad license can only downgrade the host application.

use std::io;
use std::path::Path;

use keymint_types::{Timestamp, UserId};
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use serde::Serialize;
use tracing::{debug, warn};

use crate::artifact::LicenseArtifact;
use crate::claims::{LicenseClaims, Quota};
use crate::device::FingerprintProvider;
use crate::error::{LicenseError, LicenseResult};
use crate::keys::PublicKeyCoordinates;
use crate::store::LicenseStore;

/// Production public key, embedded at build time.
pub const EMBEDDED_PUBLIC_KEY: PublicKeyCoordinates = PublicKeyCoordinates::embedded(
    "_0HOg54BdrznzdTdfR4WmFrBcxr4hzxqDO-Byx8sxik",
    "cFiADSCUPGR77t-WkJGOlq2c7VATz-pw4xNeM0lw9J0",
);

/// Why a license could not be authenticated.
///
/// All variants lead to the same trust decision; they only differ in the
/// diagnostics shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SignatureFailure {
    /// No license is installed.
    Missing,
    /// The artifact could not be parsed.
    Malformed(String),
    /// The signature does not match the claims.
    Mismatch,
}

/// Claims that passed every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedLicense {
    claims: LicenseClaims,
}

impl ValidatedLicense {
    /// Returns the verified claims.
    #[must_use]
    pub fn claims(&self) -> &LicenseClaims {
        &self.claims
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.claims.user_id
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.claims.expires_at
    }

    /// Returns the daily quota for the limited action.
    #[must_use]
    pub fn quota(&self) -> Quota {
        self.claims.quota()
    }

    /// Consumes the record, returning the claims.
    #[must_use]
    pub fn into_claims(self) -> LicenseClaims {
        self.claims
    }
}

/// Outcome of validating a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LicenseStatus {
    /// Signature valid, not expired, device matches or unbound.
    Active(ValidatedLicense),
    /// The license could not be authenticated.
    InvalidSignature(SignatureFailure),
    /// Authentic, but `expiresAt` is not in the future.
    Expired { expired_at: Timestamp },
    /// Authentic and current, but bound to another device.
    DeviceMismatch,
}

impl LicenseStatus {
    /// Returns true if the license grants access.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Returns the validated license, if active.
    #[must_use]
    pub fn license(&self) -> Option<&ValidatedLicense> {
        match self {
            Self::Active(license) => Some(license),
            _ => None,
        }
    }

    /// Converts the outcome into the error taxonomy.
    ///
    /// # Errors
    ///
    /// Returns the [`LicenseError`] matching the rejection reason.
    pub fn into_result(self) -> LicenseResult<ValidatedLicense> {
        match self {
            Self::Active(license) => Ok(license),
            Self::InvalidSignature(SignatureFailure::Malformed(reason)) => {
                Err(LicenseError::MalformedArtifact(reason))
            }
            Self::InvalidSignature(SignatureFailure::Missing) => Err(LicenseError::MalformedArtifact(
                "no license installed".to_string(),
            )),
            Self::InvalidSignature(SignatureFailure::Mismatch) => Err(LicenseError::SignatureInvalid),
            Self::Expired { expired_at } => Err(LicenseError::Expired(expired_at)),
            Self::DeviceMismatch => Err(LicenseError::DeviceMismatch),
        }
    }
}

/// Validates a parsed artifact.
pub fn verify_artifact(
    artifact: &LicenseArtifact,
    key: &VerifyingKey,
    now: Timestamp,
    fingerprints: &dyn FingerprintProvider,
) -> LicenseStatus {
    let claims = artifact.unverified_claims();

    if let Err(failure) = check_signature(artifact, key) {
        return LicenseStatus::InvalidSignature(failure);
    }

    if let Some(expires_at) = claims.expires_at {
        if expires_at <= now {
            return LicenseStatus::Expired {
                expired_at: expires_at,
            };
        }
    }

    if let Some(bound) = &claims.device_fingerprint {
        if *bound != fingerprints.current_fingerprint() {
            return LicenseStatus::DeviceMismatch;
        }
    }

    LicenseStatus::Active(ValidatedLicense {
        claims: claims.clone(),
    })
}

/// Validates a raw artifact document; `None` means no license is present.
pub fn validate_json(
    json: Option<&str>,
    key: &VerifyingKey,
    now: Timestamp,
    fingerprints: &dyn FingerprintProvider,
) -> LicenseStatus {
    let Some(json) = json else {
        return LicenseStatus::InvalidSignature(SignatureFailure::Missing);
    };
    match LicenseArtifact::from_json(json) {
        Ok(artifact) => verify_artifact(&artifact, key, now, fingerprints),
        Err(e) => LicenseStatus::InvalidSignature(SignatureFailure::Malformed(e.to_string())),
    }
}

fn check_signature(artifact: &LicenseArtifact, key: &VerifyingKey) -> Result<(), SignatureFailure> {
    let bytes = artifact
        .signature_bytes()
        .map_err(|e| SignatureFailure::Malformed(e.to_string()))?;
    let payload = artifact
        .unverified_claims()
        .canonical_bytes()
        .map_err(|e| SignatureFailure::Malformed(e.to_string()))?;
    // Out-of-range scalars cannot come from a genuine signature.
    let signature = Signature::from_slice(&bytes).map_err(|_| SignatureFailure::Mismatch)?;
    key.verify(&payload, &signature)
        .map_err(|_| SignatureFailure::Mismatch)
}

/// A public key paired with a fingerprint source.
pub struct LicenseValidator<P> {
    key: VerifyingKey,
    fingerprints: P,
}

impl<P: FingerprintProvider> LicenseValidator<P> {
    /// Creates a validator for licenses signed by `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Key`] if the coordinates are not a valid P-256 key.
    pub fn new(key: &PublicKeyCoordinates, fingerprints: P) -> LicenseResult<Self> {
        Ok(Self {
            key: key.to_verifying_key()?,
            fingerprints,
        })
    }

    /// Creates a validator using [`EMBEDDED_PUBLIC_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Key`] if the embedded key is invalid.
    pub fn embedded(fingerprints: P) -> LicenseResult<Self> {
        Self::new(&EMBEDDED_PUBLIC_KEY, fingerprints)
    }

    /// Validates a parsed artifact.
    pub fn validate(&self, artifact: &LicenseArtifact, now: Timestamp) -> LicenseStatus {
        report(verify_artifact(artifact, &self.key, now, &self.fingerprints))
    }

    /// Validates a raw artifact document; `None` means no license is present.
    pub fn validate_json(&self, json: Option<&str>, now: Timestamp) -> LicenseStatus {
        report(validate_json(json, &self.key, now, &self.fingerprints))
    }

    /// Validates an artifact file. A missing file is reported as [`SignatureFailure::Missing`].
    pub fn validate_file(&self, path: &Path, now: Timestamp) -> LicenseStatus {
        match std::fs::read_to_string(path) {
            Ok(json) => self.validate_json(Some(&json), now),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.validate_json(None, now),
            Err(e) => report(LicenseStatus::InvalidSignature(SignatureFailure::Malformed(
                format!("unreadable license file {}: {e}", path.display()),
            ))),
        }
    }

    /// Validates the license installed in `store`.
    pub fn validate_installed(&self, store: &LicenseStore, now: Timestamp) -> LicenseStatus {
        self.validate_file(store.license_path(), now)
    }
}

fn report(status: LicenseStatus) -> LicenseStatus {
    match &status {
        LicenseStatus::Active(license) => {
            debug!(user_id = %license.user_id(), "license active");
        }
        LicenseStatus::InvalidSignature(failure) => {
            warn!(?failure, "license rejected: not authentic");
        }
        LicenseStatus::Expired { expired_at } => {
            warn!(expired_at = %expired_at, "license rejected: expired");
        }
        LicenseStatus::DeviceMismatch => {
            warn!("license rejected: bound to another device");
        }
    }
    status
}

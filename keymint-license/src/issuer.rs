//! License issuance (operator side).
//!
//! Device-bound and transferable licenses go through the same path; the
//! only difference is whether `deviceFingerprint` ends up in the claims.

use std::io;
use std::path::{Path, PathBuf};

use keymint_types::{Timestamp, UserId};
use tracing::{debug, info};

use crate::artifact::LicenseArtifact;
use crate::claims::{LicenseClaims, Quota, UNLIMITED_EXPORTS};
use crate::error::{LicenseError, LicenseResult};
use crate::fsutil;
use crate::keys::KeyPair;

/// Whether the license is tied to one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueMode {
    /// Requires a device fingerprint.
    DeviceBound,
    /// Usable on any device ("mobile" licenses); carries no fingerprint.
    #[default]
    Transferable,
}

/// Operator input for one license.
#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    pub mode: IssueMode,
    /// Generated when absent.
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub device_fingerprint: Option<String>,
    /// Absolute expiry. Mutually exclusive with `valid_days`.
    pub expires_at: Option<Timestamp>,
    /// Expiry relative to the issue time, in whole days.
    pub valid_days: Option<i64>,
    /// Daily cap; unlimited when absent.
    pub max_exports: Option<i64>,
}

impl IssueOptions {
    /// Options for a transferable license.
    #[must_use]
    pub fn transferable() -> Self {
        Self::default()
    }

    /// Options for a license bound to `fingerprint`.
    #[must_use]
    pub fn device_bound(fingerprint: impl Into<String>) -> Self {
        Self {
            mode: IssueMode::DeviceBound,
            device_fingerprint: Some(fingerprint.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company_name = Some(company.into());
        self
    }

    #[must_use]
    pub fn with_valid_days(mut self, days: i64) -> Self {
        self.valid_days = Some(days);
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn with_max_exports(mut self, max_exports: i64) -> Self {
        self.max_exports = Some(max_exports);
        self
    }
}

/// A license written to disk.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub artifact: LicenseArtifact,
    pub path: PathBuf,
}

/// Builds and signs license artifacts.
#[derive(Debug)]
pub struct LicenseIssuer {
    key: KeyPair,
}

impl LicenseIssuer {
    /// Creates an issuer signing with `key`.
    #[must_use]
    pub fn new(key: KeyPair) -> Self {
        Self { key }
    }

    /// Validates `options` and produces a signed artifact issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MissingRequiredField`] when a device-bound
    /// license has no fingerprint, and [`LicenseError::InvalidClaim`] for
    /// out-of-range quotas or expiry settings.
    pub fn issue(&self, options: IssueOptions, now: Timestamp) -> LicenseResult<LicenseArtifact> {
        let claims = build_claims(options, now)?;
        self.sign(claims)
    }

    /// Signs already-built claims.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedArtifact`] if the claims would not
    /// survive parsing on the application side.
    pub fn sign(&self, claims: LicenseClaims) -> LicenseResult<LicenseArtifact> {
        claims.check_structure()?;
        let payload = claims.canonical_bytes()?;
        let signature = self.key.sign(&payload);
        debug!(user_id = %claims.user_id, bytes = payload.len(), "signed license claims");
        Ok(LicenseArtifact::new(claims, &signature))
    }

    /// Issues a license and writes it into `dir`.
    ///
    /// The file only appears once signing has succeeded, and an existing file
    /// with the same name is never replaced.
    ///
    /// # Errors
    ///
    /// Returns any issuance error, [`LicenseError::ArtifactExists`] if the
    /// target name is taken, or an I/O error if writing fails.
    pub fn issue_to_dir(
        &self,
        options: IssueOptions,
        dir: &Path,
        now: Timestamp,
    ) -> LicenseResult<IssuedLicense> {
        let artifact = self.issue(options, now)?;
        let path = dir.join(artifact_file_name(artifact.unverified_claims())?);
        let json = artifact.to_json_pretty()?;
        fsutil::write_new(&path, json.as_bytes(), false).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                LicenseError::ArtifactExists(path.clone())
            } else {
                LicenseError::Io(e)
            }
        })?;

        let claims = artifact.unverified_claims();
        info!(
            user_id = %claims.user_id,
            device_bound = claims.is_device_bound(),
            expires_at = ?claims.expires_at.map(|t| t.to_string()),
            max_exports = claims.max_exports,
            path = %path.display(),
            "issued license"
        );
        Ok(IssuedLicense { artifact, path })
    }
}

/// File name for an artifact: `license_<userId>_<YYYYMMDD>.json`.
///
/// # Errors
///
/// Returns [`LicenseError::InvalidClaim`] if the issue time has no calendar date.
pub fn artifact_file_name(claims: &LicenseClaims) -> LicenseResult<String> {
    let date = claims.issued_at.utc_date()?;
    Ok(format!(
        "license_{}_{}.json",
        claims.user_id,
        date.format("%Y%m%d")
    ))
}

fn build_claims(options: IssueOptions, now: Timestamp) -> LicenseResult<LicenseClaims> {
    let max_exports = options.max_exports.unwrap_or(UNLIMITED_EXPORTS);
    Quota::try_from(max_exports)?;

    let device_fingerprint = non_blank(options.device_fingerprint);
    match (options.mode, &device_fingerprint) {
        (IssueMode::DeviceBound, None) => {
            return Err(LicenseError::MissingRequiredField("deviceFingerprint"));
        }
        (IssueMode::Transferable, Some(_)) => {
            return Err(LicenseError::InvalidClaim(
                "transferable licenses cannot carry a device fingerprint".to_string(),
            ));
        }
        _ => {}
    }

    let expires_at = match (options.expires_at, options.valid_days) {
        (Some(_), Some(_)) => {
            return Err(LicenseError::InvalidClaim(
                "give either an expiry time or a day count, not both".to_string(),
            ));
        }
        (Some(at), None) => Some(at),
        (None, Some(days)) => Some(expiry_after_days(now, days)?),
        (None, None) => None,
    };

    Ok(LicenseClaims {
        user_id: options.user_id.unwrap_or_else(UserId::generate),
        email: non_blank(options.email),
        company_name: non_blank(options.company_name),
        device_fingerprint,
        issued_at: now,
        expires_at,
        max_exports,
    })
}

fn expiry_after_days(now: Timestamp, days: i64) -> LicenseResult<Timestamp> {
    let days = u32::try_from(days)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| {
            LicenseError::InvalidClaim(format!("days must be a positive integer, got {days}"))
        })?;
    now.checked_add_days(days)
        .ok_or_else(|| LicenseError::InvalidClaim(format!("{days} days overflows the clock")))
}

/// Trims and drops blank strings so absence never turns into `""`.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

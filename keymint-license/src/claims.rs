//! License claims and their canonical encoding.
//!
//! The canonical form is compact JSON with fields in declaration order and
//! absent optional fields omitted. Timestamps are integers and unknown fields
//! are rejected on parse, so re-encoding parsed claims reproduces exactly the
//! bytes the issuer signed, and any edit to a claim changes them.

use keymint_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, LicenseResult};

/// `maxExports` value meaning "no daily cap".
pub const UNLIMITED_EXPORTS: i64 = -1;

/// The content a license asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LicenseClaims {
    /// License holder.
    pub user_id: UserId,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Company name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Fingerprint of the only device allowed to use the license.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
    /// When the license was signed.
    pub issued_at: Timestamp,
    /// When the license stops being valid; never if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// Daily cap on the limited action, or [`UNLIMITED_EXPORTS`].
    pub max_exports: i64,
}

impl LicenseClaims {
    /// Returns the exact bytes that are signed and verified.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if JSON encoding fails.
    pub fn canonical_bytes(&self) -> LicenseResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Checks rules the type system does not enforce.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedArtifact`] if an optional string is
    /// present but empty or `maxExports` is out of range.
    pub fn check_structure(&self) -> LicenseResult<()> {
        for (name, value) in [
            ("email", &self.email),
            ("companyName", &self.company_name),
            ("deviceFingerprint", &self.device_fingerprint),
        ] {
            if value.as_deref().is_some_and(str::is_empty) {
                return Err(LicenseError::MalformedArtifact(format!(
                    "{name} is present but empty"
                )));
            }
        }
        Quota::try_from(self.max_exports)
            .map_err(|e| LicenseError::MalformedArtifact(e.to_string()))?;
        Ok(())
    }

    /// Returns the daily quota.
    ///
    /// Out-of-range values, which [`check_structure`](Self::check_structure)
    /// rejects, map to a zero quota.
    #[must_use]
    pub fn quota(&self) -> Quota {
        Quota::try_from(self.max_exports).unwrap_or(Quota::Daily(0))
    }

    /// Returns true if the license is bound to a device.
    #[must_use]
    pub fn is_device_bound(&self) -> bool {
        self.device_fingerprint.is_some()
    }
}

/// Daily allowance for the limited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quota {
    /// No cap.
    Unlimited,
    /// At most this many actions per UTC day.
    Daily(u32),
}

impl Quota {
    /// Returns the `maxExports` wire value.
    #[must_use]
    pub fn as_max_exports(&self) -> i64 {
        match self {
            Self::Unlimited => UNLIMITED_EXPORTS,
            Self::Daily(n) => i64::from(*n),
        }
    }

    /// Returns the cap, or `None` when unlimited.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Daily(n) => Some(*n),
        }
    }
}

impl TryFrom<i64> for Quota {
    type Error = LicenseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            UNLIMITED_EXPORTS => Ok(Self::Unlimited),
            n if n >= 0 => u32::try_from(n)
                .map(Self::Daily)
                .map_err(|_| LicenseError::InvalidClaim(format!("maxExports {n} is too large"))),
            n => Err(LicenseError::InvalidClaim(format!(
                "maxExports must be -1 or a non-negative integer, got {n}"
            ))),
        }
    }
}

impl From<Quota> for i64 {
    fn from(quota: Quota) -> Self {
        quota.as_max_exports()
    }
}

//! The distributable license file.
//!
//! ```json
//! {
//!   "claims": { "userId": "usr_…", "issuedAt": 1760000000000000, "maxExports": 5 },
//!   "signature": "<base64 r||s>"
//! }
//! ```

use std::fs;
use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::claims::LicenseClaims;
use crate::error::{LicenseError, LicenseResult};

/// Length of a P-256 `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// Signed claims as shipped to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseArtifact {
    claims: LicenseClaims,
    signature: String,
}

impl LicenseArtifact {
    pub(crate) fn new(claims: LicenseClaims, signature: &[u8]) -> Self {
        Self {
            claims,
            signature: BASE64.encode(signature),
        }
    }

    /// Parses an artifact from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedArtifact`] if the JSON does not match
    /// the artifact layout or the claims break a structural rule.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| LicenseError::MalformedArtifact(e.to_string()))?;
        artifact.claims.check_structure()?;
        Ok(artifact)
    }

    /// Reads and parses an artifact file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`LicenseError::MalformedArtifact`] if it cannot be parsed.
    pub fn read_from(path: &Path) -> LicenseResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes the artifact for distribution.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if JSON encoding fails.
    pub fn to_json_pretty(&self) -> LicenseResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the claims as written in the file.
    ///
    /// Nothing here has been verified; use the validator to obtain trusted claims.
    #[must_use]
    pub fn unverified_claims(&self) -> &LicenseClaims {
        &self.claims
    }

    /// Returns the base64 signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Decodes the signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedArtifact`] if the signature is not
    /// base64 or has the wrong length.
    pub fn signature_bytes(&self) -> LicenseResult<Vec<u8>> {
        let bytes = BASE64
            .decode(self.signature.as_bytes())
            .map_err(|e| LicenseError::MalformedArtifact(format!("invalid signature base64: {e}")))?;
        if bytes.len() != SIGNATURE_LEN {
            return Err(LicenseError::MalformedArtifact(format!(
                "signature must be {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

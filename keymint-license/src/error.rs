//! Error types for the licensing module.

use std::path::PathBuf;

use keymint_types::Timestamp;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Signature over the canonical claims did not verify.
    #[error("license signature invalid")]
    SignatureInvalid,

    /// Artifact could not be parsed or violates a structural rule.
    #[error("malformed license artifact: {0}")]
    MalformedArtifact(String),

    /// License expired at the given time.
    #[error("license expired at {0}")]
    Expired(Timestamp),

    /// License is bound to another device.
    #[error("license is bound to a different device")]
    DeviceMismatch,

    /// Daily quota used up.
    #[error("daily quota exceeded ({used} of {limit} used)")]
    QuotaExceeded { limit: u32, used: u32 },

    /// Key files already exist; refusing to overwrite them.
    #[error("key file already exists: {}", .0.display())]
    KeyConflict(PathBuf),

    /// A field required by the issuance mode was not supplied.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// A claim value is out of range or inconsistent.
    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    /// Key material could not be decoded.
    #[error("invalid key material: {0}")]
    Key(String),

    /// An artifact with the same name already exists.
    #[error("license artifact already exists: {}", .0.display())]
    ArtifactExists(PathBuf),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<keymint_types::Error> for LicenseError {
    fn from(err: keymint_types::Error) -> Self {
        Self::InvalidClaim(err.to_string())
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

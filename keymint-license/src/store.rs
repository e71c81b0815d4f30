//! Application-side persistence layout.
//!
//! One data directory per installation holds the active license artifact and
//! the usage record. The usage record is keyed by installation, not by
//! license, so reinstalling resets the daily counter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::artifact::LicenseArtifact;
use crate::error::{LicenseError, LicenseResult};
use crate::fsutil;
use crate::usage::FileUsageStore;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "KEYMINT_DATA_DIR";

/// Directory name under the platform data directory.
const APP_DIR: &str = "keymint";

const LICENSE_FILE: &str = "license.json";
const USAGE_FILE: &str = "usage.json";

/// Locations of the local license state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicensePaths {
    data_dir: PathBuf,
}

impl LicensePaths {
    /// Uses `data_dir` for all files.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Resolves the data directory from [`DATA_DIR_ENV`], falling back to the
    /// platform's local data directory.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Storage`] if neither is available.
    pub fn from_env() -> LicenseResult<Self> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        dirs::data_local_dir()
            .map(|dir| Self::new(dir.join(APP_DIR)))
            .ok_or_else(|| LicenseError::Storage("no local data directory on this platform".to_string()))
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn license_file(&self) -> PathBuf {
        self.data_dir.join(LICENSE_FILE)
    }

    #[must_use]
    pub fn usage_file(&self) -> PathBuf {
        self.data_dir.join(USAGE_FILE)
    }

    /// Store for the active license artifact.
    #[must_use]
    pub fn license_store(&self) -> LicenseStore {
        LicenseStore::new(self.license_file())
    }

    /// Store for the daily usage record.
    ///
    /// Each call returns a new store; wrap it in a single shared
    /// [`UsageLimiter`](crate::UsageLimiter).
    #[must_use]
    pub fn usage_store(&self) -> FileUsageStore {
        FileUsageStore::new(self.usage_file())
    }
}

/// The installed license artifact.
#[derive(Debug, Clone)]
pub struct LicenseStore {
    path: PathBuf,
}

impl LicenseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the artifact file.
    #[must_use]
    pub fn license_path(&self) -> &Path {
        &self.path
    }

    /// Installs an artifact, replacing any previous one.
    ///
    /// Only the structure is checked here; authenticity is decided by the
    /// validator each time the application starts.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedArtifact`] for unparseable input, or
    /// an I/O error if writing fails.
    pub fn install(&self, json: &str) -> LicenseResult<LicenseArtifact> {
        let artifact = LicenseArtifact::from_json(json)?;
        fsutil::write_atomic(&self.path, json.as_bytes())?;
        info!(path = %self.path.display(), "installed license artifact");
        Ok(artifact)
    }

    /// Reads the raw artifact, or `None` if nothing is installed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than a missing file.
    pub fn read(&self) -> LicenseResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the installed artifact. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than a missing file.
    pub fn remove(&self) -> LicenseResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

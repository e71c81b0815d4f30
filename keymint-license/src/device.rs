//! Device fingerprinting for license binding.
//!
//! The validator only ever compares fingerprints as opaque strings, and gets
//! the current one through [`FingerprintProvider`]. [`HostFingerprint`] is the
//! provider used by desktop hosts: a stable hash of hardware identifiers that
//! survives reboots but changes if the machine changes.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

/// Supplies the fingerprint of the device the application is running on.
pub trait FingerprintProvider {
    /// Returns the current device's fingerprint.
    fn current_fingerprint(&self) -> String;
}

impl<F> FingerprintProvider for F
where
    F: Fn() -> String,
{
    fn current_fingerprint(&self) -> String {
        self()
    }
}

/// A fixed fingerprint, for hosts that compute it elsewhere and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFingerprint(String);

impl StaticFingerprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl FingerprintProvider for StaticFingerprint {
    fn current_fingerprint(&self) -> String {
        self.0.clone()
    }
}

/// Descriptive facts about the host, shown to the operator alongside the
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub os_name: String,
    pub os_version: String,
    pub hostname: String,
    pub arch: String,
}

impl DeviceInfo {
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os_name: env::consts::OS.to_string(),
            os_version: platform::os_version().unwrap_or_else(|| UNKNOWN.to_string()),
            hostname: host_name(),
            arch: env::consts::ARCH.to_string(),
        }
    }
}

/// Fingerprint derived from this machine's identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFingerprint {
    id: String,
}

impl HostFingerprint {
    /// Computes the fingerprint of the current machine.
    ///
    /// Inputs are the OS, architecture, hostname and, where the platform has
    /// one, the persistent machine id.
    #[must_use]
    pub fn generate() -> Self {
        let mut parts = vec![
            env::consts::OS.to_string(),
            env::consts::ARCH.to_string(),
            host_name(),
        ];
        parts.extend(platform::machine_id());
        Self {
            id: digest(&parts),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl FingerprintProvider for HostFingerprint {
    fn current_fingerprint(&self) -> String {
        self.id.clone()
    }
}

const UNKNOWN: &str = "unknown";

/// Bytes of the SHA-256 digest kept in a fingerprint.
const DIGEST_PREFIX: usize = 16;

fn digest(parts: &[String]) -> String {
    let hash = Sha256::digest(parts.join("|").as_bytes());
    URL_SAFE_NO_PAD.encode(&hash[..DIGEST_PREFIX])
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Returns the value of `key` in an os-release style `KEY=value` file.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn release_field(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs;

    const MACHINE_ID_FILES: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

    pub(super) fn os_version() -> Option<String> {
        let release = fs::read_to_string("/etc/os-release").ok()?;
        super::release_field(&release, "VERSION_ID")
    }

    pub(super) fn machine_id() -> Option<String> {
        MACHINE_ID_FILES.iter().find_map(|path| {
            let id = fs::read_to_string(path).ok()?;
            let id = id.trim();
            (!id.is_empty()).then(|| id.to_string())
        })
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::process::Command;

    fn run(program: &str, args: &[&str]) -> Option<String> {
        let output = Command::new(program).args(args).output().ok()?;
        output.status.success().then_some(())?;
        String::from_utf8(output.stdout).ok()
    }

    pub(super) fn os_version() -> Option<String> {
        run("sw_vers", &["-productVersion"]).map(|v| v.trim().to_string())
    }

    pub(super) fn machine_id() -> Option<String> {
        let registry = run("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])?;
        registry
            .lines()
            .find(|line| line.contains("IOPlatformUUID"))?
            .rsplit('"')
            .nth(1)
            .map(str::to_string)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod platform {
    pub(super) fn os_version() -> Option<String> {
        None
    }

    pub(super) fn machine_id() -> Option<String> {
        None
    }
}

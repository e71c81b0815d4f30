use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use keymint_cli::{Cli, run};
use keymint_license::{DeviceInfo, HostFingerprint};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Workspace {
    _root: TempDir,
    keys: PathBuf,
    out: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let keys = root.path().join("keys");
        let out = root.path().join("licenses");
        Self {
            _root: root,
            keys,
            out,
        }
    }

    fn with_keys() -> Self {
        let ws = Self::new();
        ws.run(&["generate-keys"], "").0.unwrap();
        ws
    }

    /// Runs a command with `input` on stdin, returning its result and stdout.
    fn run(&self, args: &[&str], input: &str) -> (anyhow::Result<()>, String) {
        let mut argv = vec![
            "keymint".to_string(),
            "--keys-dir".to_string(),
            self.keys.display().to_string(),
            "--out-dir".to_string(),
            self.out.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| (*a).to_string()));
        let cli = Cli::try_parse_from(argv).unwrap();

        let mut output = Vec::new();
        let result = run(&cli, input.as_bytes(), &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    fn public_key(&self) -> String {
        self.keys.join("license-public.json").display().to_string()
    }

    fn issued(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.out) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn only_license(&self) -> PathBuf {
        let issued = self.issued();
        assert_eq!(issued.len(), 1, "expected one license in {}", self.out.display());
        issued.into_iter().next().unwrap()
    }

    fn verify(&self, file: &Path, fingerprint: &str) -> (anyhow::Result<()>, String) {
        let file = file.display().to_string();
        let key = self.public_key();
        self.run(
            &["verify", &file, "--public-key", &key, "--fingerprint", fingerprint],
            "",
        )
    }
}

// ── Argument parsing ─────────────────────────────────────────────

#[test]
fn negative_max_exports_parses() {
    let cli = Cli::try_parse_from(["keymint", "generate", "--email", "a@example.com", "--max-exports", "-1"]);
    assert!(cli.is_ok());
}

#[test]
fn generate_requires_email() {
    assert!(Cli::try_parse_from(["keymint", "generate"]).is_err());
}

#[test]
fn verify_requires_file() {
    assert!(Cli::try_parse_from(["keymint", "verify"]).is_err());
}

// ── generate-keys ────────────────────────────────────────────────

#[test]
fn generate_keys_prints_embeddable_key() {
    let ws = Workspace::new();
    let (result, stdout) = ws.run(&["generate-keys"], "");
    result.unwrap();

    assert!(stdout.contains("\"kty\": \"EC\""));
    assert!(stdout.contains("\"crv\": \"P-256\""));
    assert!(stdout.contains("pub const EMBEDDED_PUBLIC_KEY: PublicKeyCoordinates"));
    assert!(!stdout.contains("\"d\""));
    assert!(ws.keys.join("license-private.json").exists());
}

#[test]
fn generate_keys_refuses_to_overwrite() {
    let ws = Workspace::with_keys();
    let before = fs::read(ws.keys.join("license-private.json")).unwrap();

    let (result, _) = ws.run(&["generate-keys"], "");
    assert!(result.is_err());
    assert_eq!(fs::read(ws.keys.join("license-private.json")).unwrap(), before);
}

// ── generate ─────────────────────────────────────────────────────

#[test]
fn generate_then_verify() {
    let ws = Workspace::with_keys();
    let (result, stdout) = ws.run(
        &[
            "generate", "--email", "a@example.com", "--company", "Acme", "--days", "30",
            "--max-exports", "5", "--user-id", "u1",
        ],
        "",
    );
    result.unwrap();
    assert!(stdout.contains("User ID:     u1"));
    assert!(stdout.contains("Exports/day: 5"));

    let license = ws.only_license();
    let name = license.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("license_u1_"));

    let (result, stdout) = ws.verify(&license, "any-device");
    result.unwrap();
    assert!(stdout.contains("Status:      active"));
    assert!(stdout.contains("Company:     Acme"));
    assert!(stdout.contains("Device:      any (transferable)"));
}

#[test]
fn generate_defaults_to_unlimited_perpetual() {
    let ws = Workspace::with_keys();
    let (result, stdout) = ws.run(&["generate", "--email", "a@example.com"], "");
    result.unwrap();
    assert!(stdout.contains("Expires:     never"));
    assert!(stdout.contains("Exports/day: unlimited"));
}

#[test]
fn generate_without_keys_fails() {
    let ws = Workspace::new();
    let (result, _) = ws.run(&["generate", "--email", "a@example.com"], "");
    assert!(result.is_err());
    assert!(ws.issued().is_empty());
}

#[test]
fn generate_rejects_bad_values() {
    let ws = Workspace::with_keys();
    for args in [
        &["generate", "--email", "a@example.com", "--days", "0"][..],
        &["generate", "--email", "a@example.com", "--max-exports", "-3"][..],
        &["generate", "--email", "a@example.com", "--user-id", "no spaces"][..],
    ] {
        let (result, _) = ws.run(args, "");
        assert!(result.is_err(), "{args:?}");
    }
    assert!(ws.issued().is_empty());
}

// ── device / mobile ──────────────────────────────────────────────

#[test]
fn device_license_binds_to_fingerprint() {
    let ws = Workspace::with_keys();
    let (result, stdout) = ws.run(&["device"], "fp-1\na@example.com\nAcme\n30\n5\nu1\n");
    result.unwrap();
    assert!(stdout.contains("Device fingerprint: "));
    assert!(stdout.contains("Device:      fp-1"));

    let license = ws.only_license();
    ws.verify(&license, "fp-1").0.unwrap();

    let (result, stdout) = ws.verify(&license, "fp-2");
    assert!(result.is_err());
    assert!(stdout.contains("bound to a different device"));
}

#[test]
fn device_requires_fingerprint() {
    let ws = Workspace::with_keys();
    let (result, stdout) = ws.run(&["device"], "\na@example.com\n");
    assert!(result.is_err());
    assert!(!stdout.contains("Email"));
    assert!(ws.issued().is_empty());
}

#[test]
fn mobile_license_with_blank_answers() {
    let ws = Workspace::with_keys();
    let (result, stdout) = ws.run(&["mobile"], "\n\n\n\n\n");
    result.unwrap();
    assert!(!stdout.contains("Device fingerprint"));
    assert!(stdout.contains("Expires:     never"));
    assert!(stdout.contains("Exports/day: unlimited"));

    ws.verify(&ws.only_license(), "phone").0.unwrap();
}

#[test]
fn mobile_rejects_unparseable_days() {
    let ws = Workspace::with_keys();
    let (result, _) = ws.run(&["mobile"], "a@example.com\n\nthirty\n");
    assert!(result.is_err());
    assert!(ws.issued().is_empty());
}

// ── verify ───────────────────────────────────────────────────────

#[test]
fn verify_rejects_edited_license() {
    let ws = Workspace::with_keys();
    ws.run(&["generate", "--email", "a@example.com", "--max-exports", "5"], "")
        .0
        .unwrap();
    let license = ws.only_license();
    let edited = fs::read_to_string(&license)
        .unwrap()
        .replace("\"maxExports\": 5", "\"maxExports\": 999");
    fs::write(&license, edited).unwrap();

    let (result, stdout) = ws.verify(&license, "any");
    assert!(result.is_err());
    assert!(stdout.contains("signature does not match"));
}

#[test]
fn verify_against_embedded_key_rejects_fresh_vendor_key() {
    let ws = Workspace::with_keys();
    ws.run(&["generate", "--email", "a@example.com"], "").0.unwrap();
    let license = ws.only_license().display().to_string();

    let (result, _) = ws.run(&["verify", &license, "--fingerprint", "any"], "");
    assert!(result.is_err());
}

#[test]
fn verify_missing_file() {
    let ws = Workspace::with_keys();
    let (result, stdout) = ws.verify(&ws.out.join("absent.json"), "any");
    assert!(result.is_err());
    assert!(stdout.contains("no license"));
}

// ── fingerprint ──────────────────────────────────────────────────

#[test]
fn fingerprint_is_stable() {
    let ws = Workspace::new();
    let (result, first) = ws.run(&["fingerprint"], "");
    result.unwrap();
    let (_, second) = ws.run(&["fingerprint"], "");
    assert_eq!(first, second);

    let id = first.lines().next().unwrap();
    assert_eq!(id, HostFingerprint::generate().id());
}

#[test]
fn fingerprint_lists_host_details() {
    let ws = Workspace::new();
    let (result, stdout) = ws.run(&["fingerprint"], "");
    result.unwrap();

    let info = DeviceInfo::collect();
    assert!(stdout.contains(&format!("OS:          {} {}", info.os_name, info.os_version)));
    assert!(stdout.contains(&format!("Arch:        {}", info.arch)));
    assert!(stdout.contains(&format!("Hostname:    {}", info.hostname)));
}

//! Command implementations.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use keymint_license::{
    DeviceInfo, EMBEDDED_PUBLIC_KEY, HostFingerprint, IssueOptions, IssuedLicense, KeyStore,
    LicenseClaims, LicenseIssuer, LicenseStatus, LicenseValidator, SignatureFailure,
    StaticFingerprint, Timestamp, UserId, load_public_key,
};
use tracing::debug;

use crate::{Cli, Console, GenerateArgs, VerifyArgs};

/// Name of the constant in the printed embedding snippet.
const EMBED_CONST_NAME: &str = "EMBEDDED_PUBLIC_KEY";

pub(crate) fn generate_keys<R: BufRead, W: Write>(
    cli: &Cli,
    console: &mut Console<R, W>,
) -> Result<()> {
    let store = KeyStore::new(&cli.keys_dir);
    let pair = store.generate().with_context(|| {
        format!(
            "Failed to generate keys in {} (existing keys are never overwritten)",
            cli.keys_dir.display()
        )
    })?;
    let public = pair.public_key();
    let json = serde_json::to_string_pretty(&public).context("Failed to encode public key")?;

    let out = console.out();
    writeln!(out, "Private key: {}", store.private_key_path().display())?;
    writeln!(out, "Public key:  {}", store.public_key_path().display())?;
    writeln!(out)?;
    writeln!(out, "{json}")?;
    writeln!(out)?;
    writeln!(out, "Embed in the application:")?;
    writeln!(out, "{}", public.to_rust_const(EMBED_CONST_NAME))?;
    writeln!(out)?;
    writeln!(out, "Keep the private key offline; losing it means no new licenses.")?;
    Ok(())
}

pub(crate) fn generate<R: BufRead, W: Write>(
    cli: &Cli,
    args: &GenerateArgs,
    console: &mut Console<R, W>,
) -> Result<()> {
    let mut options = IssueOptions::transferable().with_email(&args.email);
    if let Some(company) = &args.company {
        options = options.with_company(company);
    }
    if let Some(days) = args.days {
        options = options.with_valid_days(days);
    }
    if let Some(max_exports) = args.max_exports {
        options = options.with_max_exports(max_exports);
    }
    if let Some(user_id) = &args.user_id {
        options = options.with_user_id(parse_user_id(user_id)?);
    }
    issue(cli, options, console)
}

/// Prompts for license fields; `device_bound` also asks for the fingerprint.
pub(crate) fn interactive<R: BufRead, W: Write>(
    cli: &Cli,
    device_bound: bool,
    console: &mut Console<R, W>,
) -> Result<()> {
    let mut options = if device_bound {
        let fingerprint = console.ask("Device fingerprint")?;
        if fingerprint.is_empty() {
            bail!("A device fingerprint is required for a device-bound license");
        }
        IssueOptions::device_bound(fingerprint)
    } else {
        IssueOptions::transferable()
    };

    if let Some(email) = console.ask_optional("Email")? {
        options = options.with_email(email);
    }
    if let Some(company) = console.ask_optional("Company (optional)")? {
        options = options.with_company(company);
    }
    if let Some(days) = console.ask_parsed("Valid days (blank for perpetual)")? {
        options = options.with_valid_days(days);
    }
    if let Some(max_exports) = console.ask_parsed("Max exports per day (blank or -1 for unlimited)")? {
        options = options.with_max_exports(max_exports);
    }
    if let Some(user_id) = console.ask_optional("User ID (blank to generate)")? {
        options = options.with_user_id(parse_user_id(&user_id)?);
    }
    writeln!(console.out())?;
    issue(cli, options, console)
}

pub(crate) fn verify<R: BufRead, W: Write>(
    args: &VerifyArgs,
    console: &mut Console<R, W>,
) -> Result<()> {
    let key = match &args.public_key {
        Some(path) => load_public_key(path)
            .with_context(|| format!("Failed to load public key {}", path.display()))?,
        None => EMBEDDED_PUBLIC_KEY,
    };
    let fingerprint = match &args.fingerprint {
        Some(fp) => fp.clone(),
        None => HostFingerprint::generate().id().to_string(),
    };
    debug!(file = %args.file.display(), "verifying license");

    let validator = LicenseValidator::new(&key, StaticFingerprint::new(fingerprint))
        .context("Public key is not a valid P-256 key")?;
    let status = validator.validate_file(&args.file, Timestamp::now());

    let out = console.out();
    match &status {
        LicenseStatus::Active(license) => {
            writeln!(out, "Status:      active")?;
            print_claims(out, license.claims())?;
            return Ok(());
        }
        LicenseStatus::InvalidSignature(SignatureFailure::Missing) => {
            writeln!(out, "Status:      no license at {}", args.file.display())?;
        }
        LicenseStatus::InvalidSignature(SignatureFailure::Malformed(reason)) => {
            writeln!(out, "Status:      invalid (malformed: {reason})")?;
        }
        LicenseStatus::InvalidSignature(SignatureFailure::Mismatch) => {
            writeln!(out, "Status:      invalid (signature does not match)")?;
        }
        LicenseStatus::Expired { expired_at } => {
            writeln!(out, "Status:      expired at {expired_at}")?;
        }
        LicenseStatus::DeviceMismatch => {
            writeln!(out, "Status:      bound to a different device")?;
        }
    }
    bail!("License {} is not active", args.file.display())
}

pub(crate) fn fingerprint<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<()> {
    let fingerprint = HostFingerprint::generate();
    let info = DeviceInfo::collect();

    let out = console.out();
    writeln!(out, "{}", fingerprint.id())?;
    writeln!(out)?;
    writeln!(out, "OS:          {} {}", info.os_name, info.os_version)?;
    writeln!(out, "Arch:        {}", info.arch)?;
    writeln!(out, "Hostname:    {}", info.hostname)?;
    Ok(())
}

fn issue<R: BufRead, W: Write>(
    cli: &Cli,
    options: IssueOptions,
    console: &mut Console<R, W>,
) -> Result<()> {
    let pair = KeyStore::new(&cli.keys_dir)
        .load_key_pair()
        .with_context(|| format!("Failed to load private key from {}", cli.keys_dir.display()))?;
    let IssuedLicense { artifact, path } = LicenseIssuer::new(pair)
        .issue_to_dir(options, &cli.out_dir, Timestamp::now())
        .context("Failed to issue license")?;

    let out = console.out();
    writeln!(out, "License:     {}", path.display())?;
    print_claims(out, artifact.unverified_claims())?;
    Ok(())
}

fn print_claims(out: &mut impl Write, claims: &LicenseClaims) -> Result<()> {
    writeln!(out, "User ID:     {}", claims.user_id)?;
    if let Some(email) = &claims.email {
        writeln!(out, "Email:       {email}")?;
    }
    if let Some(company) = &claims.company_name {
        writeln!(out, "Company:     {company}")?;
    }
    match &claims.device_fingerprint {
        Some(fp) => writeln!(out, "Device:      {fp}")?,
        None => writeln!(out, "Device:      any (transferable)")?,
    }
    writeln!(out, "Issued:      {}", claims.issued_at)?;
    match claims.expires_at {
        Some(at) => writeln!(out, "Expires:     {at}")?,
        None => writeln!(out, "Expires:     never")?,
    }
    match claims.quota().limit() {
        Some(limit) => writeln!(out, "Exports/day: {limit}")?,
        None => writeln!(out, "Exports/day: unlimited")?,
    }
    Ok(())
}

fn parse_user_id(raw: &str) -> Result<UserId> {
    UserId::parse(raw).with_context(|| format!("Invalid user id {raw:?}"))
}

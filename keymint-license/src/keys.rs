//! Vendor keypair generation, export and storage.
//!
//! Licenses are signed with ECDSA over P-256. The public half is exported as
//! its affine coordinates (JWK style, base64url without padding) so it can be
//! pasted into application code as literal strings:
//!
//! ```json
//! { "kty": "EC", "crv": "P-256", "x": "...", "y": "..." }
//! ```
//!
//! The private half is written once to the operator's key directory and is
//! never needed by the application.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey, signature::Signer};
use p256::{EncodedPoint, FieldBytes};
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{LicenseError, LicenseResult};
use crate::fsutil;

/// JWK key type for elliptic-curve keys.
pub const KEY_TYPE: &str = "EC";

/// JWK curve name.
pub const CURVE: &str = "P-256";

/// Length of one P-256 coordinate or scalar, in bytes.
const COORDINATE_LEN: usize = 32;

/// File name of the private key inside a key directory.
pub const PRIVATE_KEY_FILE: &str = "license-private.json";

/// File name of the exported public key inside a key directory.
pub const PUBLIC_KEY_FILE: &str = "license-public.json";

/// Public key as named curve coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCoordinates {
    /// Key type, always `EC`.
    pub kty: Cow<'static, str>,
    /// Curve name, always `P-256`.
    pub crv: Cow<'static, str>,
    /// Affine x coordinate, base64url.
    pub x: Cow<'static, str>,
    /// Affine y coordinate, base64url.
    pub y: Cow<'static, str>,
}

impl PublicKeyCoordinates {
    /// Builds coordinates from literal strings, for keys embedded at build time.
    #[must_use]
    pub const fn embedded(x: &'static str, y: &'static str) -> Self {
        Self {
            kty: Cow::Borrowed(KEY_TYPE),
            crv: Cow::Borrowed(CURVE),
            x: Cow::Borrowed(x),
            y: Cow::Borrowed(y),
        }
    }

    /// Decodes the coordinates into a verifying key.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Key`] if the key type, curve or coordinates are
    /// invalid or the point is not on the curve.
    pub fn to_verifying_key(&self) -> LicenseResult<VerifyingKey> {
        if self.kty != KEY_TYPE || self.crv != CURVE {
            return Err(LicenseError::Key(format!(
                "unsupported key {}/{}, expected {KEY_TYPE}/{CURVE}",
                self.kty, self.crv
            )));
        }
        let x = decode_coordinate("x", &self.x)?;
        let y = decode_coordinate("y", &self.y)?;
        let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
        VerifyingKey::from_encoded_point(&point)
            .map_err(|_| LicenseError::Key("point is not on the P-256 curve".to_string()))
    }

    /// Encodes a verifying key as coordinates.
    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Uncompressed, non-identity points always carry both coordinates.
        let x = point.x().map(|x| URL_SAFE_NO_PAD.encode(x)).unwrap_or_default();
        let y = point.y().map(|y| URL_SAFE_NO_PAD.encode(y)).unwrap_or_default();
        Self {
            kty: Cow::Borrowed(KEY_TYPE),
            crv: Cow::Borrowed(CURVE),
            x: Cow::Owned(x),
            y: Cow::Owned(y),
        }
    }

    /// Renders a Rust constant declaration for pasting into application code.
    #[must_use]
    pub fn to_rust_const(&self, name: &str) -> String {
        format!(
            "pub const {name}: PublicKeyCoordinates = PublicKeyCoordinates::embedded(\n    \"{}\",\n    \"{}\",\n);",
            self.x, self.y
        )
    }
}

/// On-disk form of the private key (a private JWK).
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct PrivateKeyFile {
    kty: String,
    crv: String,
    x: String,
    y: String,
    d: String,
}

/// The vendor signing keypair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a new random keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Creates a keypair from a 32-byte private scalar.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Key`] if the bytes are not a valid scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> LicenseResult<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|_| LicenseError::Key("invalid P-256 private scalar".to_string()))?;
        Ok(Self { signing_key })
    }

    /// Returns the public key coordinates.
    #[must_use]
    pub fn public_key(&self) -> PublicKeyCoordinates {
        PublicKeyCoordinates::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Returns the verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a message, returning the fixed-size `r || s` signature bytes.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }

    /// Serializes the private key as a JWK document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if JSON encoding fails.
    pub fn to_private_jwk(&self) -> LicenseResult<Zeroizing<String>> {
        let public = self.public_key();
        let secret = Zeroizing::new(self.signing_key.to_bytes().to_vec());
        let file = PrivateKeyFile {
            kty: KEY_TYPE.to_string(),
            crv: CURVE.to_string(),
            x: public.x.into_owned(),
            y: public.y.into_owned(),
            d: URL_SAFE_NO_PAD.encode(secret.as_slice()),
        };
        Ok(Zeroizing::new(serde_json::to_string_pretty(&file)?))
    }

    /// Parses a private JWK document.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Key`] if the document is not a P-256 private key
    /// or its public coordinates do not belong to the private scalar.
    pub fn from_private_jwk(json: &str) -> LicenseResult<Self> {
        let file: PrivateKeyFile = serde_json::from_str(json)
            .map_err(|e| LicenseError::Key(format!("unreadable private key: {e}")))?;
        if file.kty != KEY_TYPE || file.crv != CURVE {
            return Err(LicenseError::Key(format!(
                "unsupported key {}/{}, expected {KEY_TYPE}/{CURVE}",
                file.kty, file.crv
            )));
        }
        let d = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(file.d.as_bytes())
                .map_err(|e| LicenseError::Key(format!("invalid d: {e}")))?,
        );
        let pair = Self::from_secret_bytes(&d)?;
        let public = pair.public_key();
        if public.x != file.x || public.y != file.y {
            return Err(LicenseError::Key(
                "public coordinates do not match the private scalar".to_string(),
            ));
        }
        Ok(pair)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key())
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Directory holding the vendor key files.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Creates a key store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the key directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the private key file.
    #[must_use]
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Returns true if either key file is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.private_key_path().exists() || self.public_key_path().exists()
    }

    /// Generates a keypair and writes both key files.
    ///
    /// Issuing with a new key invalidates every license signed by the old
    /// one, so existing files are never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::KeyConflict`] if either file already exists,
    /// or an I/O error if writing fails.
    pub fn generate(&self) -> LicenseResult<KeyPair> {
        for path in [self.private_key_path(), self.public_key_path()] {
            if path.exists() {
                return Err(LicenseError::KeyConflict(path));
            }
        }

        let pair = KeyPair::generate();
        let private_jwk = pair.to_private_jwk()?;
        let public_json = serde_json::to_string_pretty(&pair.public_key())?;

        let private_path = self.private_key_path();
        fsutil::write_new(&private_path, private_jwk.as_bytes(), true)
            .map_err(|e| conflict_or_io(e, &private_path))?;

        let public_path = self.public_key_path();
        if let Err(e) = fsutil::write_new(&public_path, public_json.as_bytes(), false) {
            // Leave no half-initialized key directory behind.
            let _ = fs::remove_file(&private_path);
            return Err(conflict_or_io(e, &public_path));
        }

        info!(dir = %self.dir.display(), "generated license signing keypair");
        Ok(pair)
    }

    /// Loads the signing keypair.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read or a key error if it is invalid.
    pub fn load_key_pair(&self) -> LicenseResult<KeyPair> {
        let json = Zeroizing::new(fs::read_to_string(self.private_key_path())?);
        KeyPair::from_private_jwk(&json)
    }

    /// Loads the exported public key.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read or a key error if it is invalid.
    pub fn load_public_key(&self) -> LicenseResult<PublicKeyCoordinates> {
        load_public_key(&self.public_key_path())
    }
}

/// Reads and checks a public key export file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or a key error if it is invalid.
pub fn load_public_key(path: &Path) -> LicenseResult<PublicKeyCoordinates> {
    let json = fs::read_to_string(path)?;
    let key: PublicKeyCoordinates = serde_json::from_str(&json)
        .map_err(|e| LicenseError::Key(format!("unreadable public key: {e}")))?;
    key.to_verifying_key()?;
    Ok(key)
}

fn conflict_or_io(err: io::Error, path: &Path) -> LicenseError {
    if err.kind() == io::ErrorKind::AlreadyExists {
        LicenseError::KeyConflict(path.to_path_buf())
    } else {
        LicenseError::Io(err)
    }
}

fn decode_coordinate(name: &str, value: &str) -> LicenseResult<FieldBytes> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value.as_bytes())
        .map_err(|e| LicenseError::Key(format!("invalid {name} coordinate: {e}")))?;
    if bytes.len() != COORDINATE_LEN {
        return Err(LicenseError::Key(format!(
            "{name} coordinate must be {COORDINATE_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(*FieldBytes::from_slice(&bytes))
}

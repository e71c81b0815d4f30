//! Identifier types carried in license claims.
//!
//! User ids are short printable strings. Generated ids use a random UUID v4
//! suffix so operators issuing many licenses do not collide in practice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Maximum length of a user id, in bytes.
pub const MAX_USER_ID_LEN: usize = 64;

/// Prefix for generated user ids.
const GENERATED_PREFIX: &str = "usr_";

/// Identifier of the license holder.
///
/// Restricted to ASCII letters, digits, `-` and `_` so the id can be used
/// verbatim in artifact file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Generates a fresh user id with a random suffix.
    #[must_use]
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{GENERATED_PREFIX}{}", &suffix[..16]))
    }

    /// Parses a user id, rejecting empty, oversized or non-portable values.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::InvalidUserId("must not be empty".to_string()));
        }
        if s.len() > MAX_USER_ID_LEN {
            return Err(Error::InvalidUserId(format!(
                "must be at most {MAX_USER_ID_LEN} bytes"
            )));
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(Error::InvalidUserId(format!("unexpected character {bad:?}")));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

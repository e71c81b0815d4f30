//! Core type definitions for keymint.
//!
//! This crate defines the small value types shared by the issuer, the
//! validator and the usage limiter:
//! - User identifiers carried in license claims
//! - Microsecond-precision UTC timestamps
//!
//! Both types serialize to plain JSON scalars so they can appear inside the
//! canonical claim payload without any formatting ambiguity.

mod ids;
mod timestamp;

pub use ids::UserId;
pub use timestamp::{MICROS_PER_DAY, Timestamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

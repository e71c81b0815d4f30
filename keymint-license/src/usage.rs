//! Daily usage limiting for the quota-gated action.
//!
//! The limiter keeps one [`UsageRecord`] per installation: the UTC day it
//! refers to and how many actions ran that day. A record for any other day is
//! treated as zero usage today.
//!
//! The read-check-write cycle runs under a mutex, so concurrent callers in one
//! process cannot both take the last slot. Separate processes sharing the same
//! record file are not coordinated.
//!
//! Any failure to read or write the record, or a poisoned lock, denies the
//! action.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use keymint_types::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::claims::Quota;
use crate::error::{LicenseError, LicenseResult};
use crate::fsutil;

/// Usage of the limited action on one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// UTC calendar day, `YYYY-MM-DD`.
    pub day: NaiveDate,
    /// Actions performed on `day`.
    pub count: u32,
}

impl UsageRecord {
    /// An empty record for `day`.
    #[must_use]
    pub const fn empty(day: NaiveDate) -> Self {
        Self { day, count: 0 }
    }

    /// Returns this record if it is for `today`, else an empty one.
    #[must_use]
    pub fn for_day(self, today: NaiveDate) -> Self {
        if self.day == today {
            self
        } else {
            Self::empty(today)
        }
    }
}

/// Persistence for the usage record.
pub trait UsageStore: Send + Sync {
    /// Loads the stored record, or `None` if there is none yet.
    fn load(&self) -> LicenseResult<Option<UsageRecord>>;

    /// Replaces the stored record.
    fn save(&self, record: &UsageRecord) -> LicenseResult<()>;
}

/// Usage record kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileUsageStore {
    path: PathBuf,
}

impl FileUsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UsageStore for FileUsageStore {
    fn load(&self) -> LicenseResult<Option<UsageRecord>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LicenseError::Storage(format!(
                    "failed to read usage record {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&json).map(Some).map_err(|e| {
            LicenseError::Storage(format!(
                "corrupt usage record {}: {e}",
                self.path.display()
            ))
        })
    }

    fn save(&self, record: &UsageRecord) -> LicenseResult<()> {
        let json = serde_json::to_vec(record)?;
        fsutil::write_atomic(&self.path, &json).map_err(|e| {
            LicenseError::Storage(format!(
                "failed to write usage record {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// Usage record held in memory.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    record: Mutex<Option<UsageRecord>>,
}

impl MemoryUsageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing record.
    #[must_use]
    pub fn with_record(record: UsageRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl UsageStore for MemoryUsageStore {
    fn load(&self) -> LicenseResult<Option<UsageRecord>> {
        Ok(*self.record.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn save(&self, record: &UsageRecord) -> LicenseResult<()> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(*record);
        Ok(())
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// Today's quota is used up.
    QuotaExceeded { limit: u32, used: u32 },
    /// The usage record could not be read or written.
    StorageUnavailable(String),
}

/// Result of asking to perform the limited action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageDecision {
    /// The action may run; `used` already counts it.
    Permitted { used: u32, remaining: Option<u32> },
    /// The action must not run.
    Denied(DenyReason),
}

impl UsageDecision {
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted { .. })
    }

    /// Converts the decision into the error taxonomy, returning today's count.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::QuotaExceeded`] or [`LicenseError::Storage`].
    pub fn into_result(self) -> LicenseResult<u32> {
        match self {
            Self::Permitted { used, .. } => Ok(used),
            Self::Denied(DenyReason::QuotaExceeded { limit, used }) => {
                Err(LicenseError::QuotaExceeded { limit, used })
            }
            Self::Denied(DenyReason::StorageUnavailable(reason)) => Err(LicenseError::Storage(reason)),
        }
    }
}

/// Enforces the daily quota against a [`UsageStore`].
///
/// The lock belongs to the limiter, not to the store. Hosts must keep one
/// limiter per usage file and share it (for example through `Arc`); two
/// limiters over the same file do not serialize against each other.
#[derive(Debug)]
pub struct UsageLimiter<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S: UsageStore> UsageLimiter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks the quota for the current UTC day and counts one action if allowed.
    pub fn check_and_increment(&self, quota: Quota) -> UsageDecision {
        self.check_and_increment_at(quota, Timestamp::now())
    }

    /// Checks the quota for the UTC day containing `now` and counts one
    /// action if allowed.
    pub fn check_and_increment_at(&self, quota: Quota, now: Timestamp) -> UsageDecision {
        // A caller panicked mid-update; the record may not reflect it.
        let Ok(_guard) = self.lock.lock() else {
            warn!("usage lock poisoned, denying action");
            return UsageDecision::Denied(DenyReason::StorageUnavailable(
                "usage lock poisoned".to_string(),
            ));
        };
        match self.consume(quota, now) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "usage record unavailable, denying action");
                UsageDecision::Denied(DenyReason::StorageUnavailable(e.to_string()))
            }
        }
    }

    /// Returns how many actions ran on the UTC day containing `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record cannot be read.
    pub fn usage_at(&self, now: Timestamp) -> LicenseResult<u32> {
        let today = now.utc_date()?;
        Ok(self.current(today)?.count)
    }

    /// Returns how many actions remain on the UTC day containing `now`,
    /// or `None` when unlimited.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record cannot be read.
    pub fn remaining_at(&self, quota: Quota, now: Timestamp) -> LicenseResult<Option<u32>> {
        let used = self.usage_at(now)?;
        Ok(quota.limit().map(|limit| limit.saturating_sub(used)))
    }

    fn consume(&self, quota: Quota, now: Timestamp) -> LicenseResult<UsageDecision> {
        let today = now.utc_date()?;
        let record = self.current(today)?;

        if let Quota::Daily(limit) = quota {
            if record.count >= limit {
                debug!(limit, used = record.count, "daily quota exceeded");
                return Ok(UsageDecision::Denied(DenyReason::QuotaExceeded {
                    limit,
                    used: record.count,
                }));
            }
        }

        let updated = UsageRecord {
            day: today,
            count: record.count.saturating_add(1),
        };
        self.store.save(&updated)?;
        debug!(day = %updated.day, used = updated.count, "counted limited action");

        Ok(UsageDecision::Permitted {
            used: updated.count,
            remaining: quota.limit().map(|limit| limit.saturating_sub(updated.count)),
        })
    }

    fn current(&self, today: NaiveDate) -> LicenseResult<UsageRecord> {
        Ok(self
            .store
            .load()?
            .map_or(UsageRecord::empty(today), |record| record.for_day(today)))
    }
}

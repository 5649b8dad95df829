//! State locking for concurrent access protection.
//!
//! A lock file keeps two runs from recording objects into the same state
//! at once. Locks expire so a crashed run cannot block others forever.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lock expiry duration in seconds.
pub const LOCK_EXPIRY_SECS: i64 = 600;

/// Information about a state lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// Operation the holder is running.
    #[serde(default)]
    pub operation: Option<String>,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Creates a new lock held by `holder`.
    #[must_use]
    pub fn new(holder: &str) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            operation: None,
            acquired_at: now,
            expires_at: now + Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Records the operation the holder is running.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Generates a holder identifier for the current process: `host-pid-suffix`.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get()
        .map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let suffix = Uuid::new_v4().simple().to_string();

    format!("{hostname}-{}-{}", std::process::id(), &suffix[..8])
}

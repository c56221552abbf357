//! Failed-attempt rate limiting for MFA verification.
//!
//! Implements a sliding-window lockout over the append-only attempt log:
//! a user is locked once `max_failures` failed attempts fall inside the
//! trailing `window_minutes`, and unlocked again when the oldest of them
//! leaves the window.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use vigil_core::AppResult;
use vigil_domain::{AttemptRecord, UserId};

use crate::{AttemptRepository, Clock};

/// Lockout policy evaluated against attempt history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Failed attempts within the window that trigger a lockout.
    pub max_failures: u32,
    /// Trailing window length in minutes.
    pub window_minutes: u32,
}

impl RateLimitPolicy {
    /// Creates a rate limit policy.
    #[must_use]
    pub fn new(max_failures: u32, window_minutes: u32) -> Self {
        Self {
            max_failures,
            window_minutes,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(5, 15)
    }
}

/// Lockout state of a user at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStatus {
    /// Whether verification is currently refused.
    pub locked: bool,
    /// Whole minutes, rounded up, until the lockout lifts. Zero when
    /// unlocked.
    pub remaining_minutes: u32,
}

impl LockStatus {
    fn unlocked() -> Self {
        Self {
            locked: false,
            remaining_minutes: 0,
        }
    }
}

/// Application service for attempt rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn AttemptRepository>,
    clock: Arc<dyn Clock>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn AttemptRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Checks whether the user has exhausted the failure budget of `policy`.
    pub async fn check_locked(
        &self,
        user_id: UserId,
        policy: &RateLimitPolicy,
    ) -> AppResult<LockStatus> {
        let now = self.clock.now();
        let window = Duration::minutes(i64::from(policy.window_minutes));
        let since = now - window;

        let failures = self
            .repository
            .count_recent_failures(user_id, since)
            .await?;

        if failures < policy.max_failures {
            return Ok(LockStatus::unlocked());
        }

        let oldest = self
            .repository
            .oldest_recent_failure(user_id, since)
            .await?
            .unwrap_or(now);
        let remaining_seconds = (oldest + window - now).num_seconds().max(0);
        let remaining_minutes = u32::try_from((remaining_seconds + 59) / 60)
            .unwrap_or(policy.window_minutes)
            .max(1);

        debug!(
            user_id = %user_id,
            failures,
            remaining_minutes,
            "MFA verification rate limit reached"
        );

        Ok(LockStatus {
            locked: true,
            remaining_minutes,
        })
    }

    /// Appends a verification outcome to the attempt log.
    pub async fn record_attempt(&self, record: AttemptRecord) -> AppResult<()> {
        self.repository.append_attempt(record).await
    }
}

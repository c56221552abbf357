//! MFA (TOTP) enrollment, verification, and backup code management.
//!
//! - TOTP codes are 6 digits over 30-second steps, with a configurable
//!   skew window (default +/-1 step).
//! - Backup codes are single-use and stored hashed.
//! - Every verification outcome is appended to the attempt log, which
//!   drives the failed-attempt lockout.
//!
//! Secrets, submitted tokens, and plaintext backup codes never reach the
//! logs; only user ids and outcomes do.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use vigil_core::AppResult;
use vigil_domain::AttemptType;

use crate::{AttemptRepository, Clock, MfaPolicy, MfaRepository, RateLimitService};

/// TOTP enrollment data returned to the user for QR code display.
#[derive(Clone)]
pub struct TotpEnrollment {
    /// Base32-encoded TOTP secret for manual entry.
    pub secret_base32: String,
    /// otpauth:// URI for QR code generation.
    pub provisioning_uri: String,
    /// Single-use backup codes (plaintext, shown once).
    pub backup_codes: Vec<String>,
}

impl std::fmt::Debug for TotpEnrollment {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TotpEnrollment")
            .field("secret_base32", &"<redacted>")
            .field("provisioning_uri", &"<redacted>")
            .field("backup_codes", &self.backup_codes.len())
            .finish()
    }
}

/// Where a user stands in the enrollment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    /// No credential exists.
    NotEnrolled,
    /// A secret was issued but never confirmed with a valid code.
    PendingVerification,
    /// MFA is active for login.
    Enabled,
}

/// Result of confirming an enrollment with the first authenticator code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The code matched; MFA is now enabled.
    Enabled,
    /// The code did not match; the enrollment stays pending.
    InvalidToken,
    /// There is no enrollment to confirm.
    NotInitiated,
    /// Too many recent failures.
    LockedOut {
        /// Minutes until another attempt is accepted.
        remaining_minutes: u32,
    },
}

/// Result of a login-time MFA verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The submission matched a TOTP code or an unused backup code.
    Success {
        /// Factor that matched.
        method: AttemptType,
    },
    /// Neither the TOTP code nor any unused backup code matched.
    InvalidToken,
    /// The user has no enabled MFA credential.
    NotInitiated,
    /// Too many recent failures; nothing was verified or recorded.
    LockedOut {
        /// Minutes until another attempt is accepted.
        remaining_minutes: u32,
    },
}

/// Application service for MFA operations.
#[derive(Clone)]
pub struct MfaService {
    mfa_repository: Arc<dyn MfaRepository>,
    rate_limit_service: RateLimitService,
    clock: Arc<dyn Clock>,
    policy: MfaPolicy,
}

impl MfaService {
    /// Creates a new MFA service.
    ///
    /// The policy is validated here as well as in `MfaPolicy::from_env`, so
    /// a policy assembled in code cannot disable the lockout or widen the
    /// TOTP window past its bound.
    pub fn new(
        mfa_repository: Arc<dyn MfaRepository>,
        attempt_repository: Arc<dyn AttemptRepository>,
        clock: Arc<dyn Clock>,
        policy: MfaPolicy,
    ) -> AppResult<Self> {
        policy.validate()?;

        Ok(Self {
            mfa_repository,
            rate_limit_service: RateLimitService::new(attempt_repository, clock.clone()),
            clock,
            policy,
        })
    }

    /// Returns the policy the service enforces.
    #[must_use]
    pub fn policy(&self) -> &MfaPolicy {
        &self.policy
    }
}

fn unix_seconds(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp()).unwrap_or(0)
}

mod enrollment;
mod management;
mod secrets;
mod verification;

pub use secrets::{generate_backup_codes, generate_secret, hash_backup_code};

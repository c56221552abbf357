//! MFA policy configuration.
//!
//! The policy is passed into `MfaService` explicitly; nothing here is
//! process-global. `from_env` reads the `MFA_*` variables and falls back
//! to the defaults below for any that are unset or blank.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use vigil_core::{AppError, AppResult};

use crate::RateLimitPolicy;

/// Largest accepted TOTP skew window, in steps on either side.
const MAX_TOTP_WINDOW: u32 = 3;

/// Policy knobs for enrollment and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaPolicy {
    /// Issuer shown by authenticator apps and embedded in provisioning URIs.
    pub issuer: String,
    /// Accepted clock skew in 30-second steps on either side of now.
    pub totp_window: u32,
    /// Failed-attempt lockout policy.
    pub rate_limit: RateLimitPolicy,
    /// Backup codes issued per enrollment or regeneration.
    pub backup_code_count: u32,
}

impl Default for MfaPolicy {
    fn default() -> Self {
        Self {
            issuer: "Vigil".to_owned(),
            totp_window: 1,
            rate_limit: RateLimitPolicy::default(),
            backup_code_count: 10,
        }
    }
}

impl MfaPolicy {
    /// Loads the policy from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the policy from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let policy = Self {
            issuer: value("MFA_ISSUER")
                .map(|issuer| issuer.trim().to_owned())
                .unwrap_or(defaults.issuer),
            totp_window: parse_or(value("MFA_TOTP_WINDOW"), "MFA_TOTP_WINDOW", defaults.totp_window)?,
            rate_limit: RateLimitPolicy {
                max_failures: parse_or(
                    value("MFA_MAX_FAILURES"),
                    "MFA_MAX_FAILURES",
                    defaults.rate_limit.max_failures,
                )?,
                window_minutes: parse_or(
                    value("MFA_LOCKOUT_WINDOW_MINUTES"),
                    "MFA_LOCKOUT_WINDOW_MINUTES",
                    defaults.rate_limit.window_minutes,
                )?,
            },
            backup_code_count: parse_or(
                value("MFA_BACKUP_CODE_COUNT"),
                "MFA_BACKUP_CODE_COUNT",
                defaults.backup_code_count,
            )?,
        };

        policy.validate()?;
        Ok(policy)
    }

    /// Rejects policies that would disable a protection.
    pub fn validate(&self) -> AppResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(AppError::Validation(
                "MFA issuer must not be empty".to_owned(),
            ));
        }

        if self.totp_window > MAX_TOTP_WINDOW {
            return Err(AppError::Validation(format!(
                "MFA_TOTP_WINDOW must be at most {MAX_TOTP_WINDOW}, got {}",
                self.totp_window
            )));
        }

        if self.rate_limit.max_failures == 0 {
            return Err(AppError::Validation(
                "MFA_MAX_FAILURES must be at least 1".to_owned(),
            ));
        }

        if self.rate_limit.window_minutes == 0 {
            return Err(AppError::Validation(
                "MFA_LOCKOUT_WINDOW_MINUTES must be at least 1".to_owned(),
            ));
        }

        if self.backup_code_count == 0 {
            return Err(AppError::Validation(
                "MFA_BACKUP_CODE_COUNT must be at least 1".to_owned(),
            ));
        }

        Ok(())
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {key}: {error}")))
    })
    .transpose()
    .map(|parsed| parsed.unwrap_or(default))
}

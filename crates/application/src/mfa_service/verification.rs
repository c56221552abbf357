use tracing::{debug, info, warn};

use vigil_core::{AppResult, constant_time_eq};
use vigil_domain::{AttemptRecord, AttemptType, MfaCredential, UserId, totp};

use super::secrets::hash_backup_code;
use super::*;

const INVALID_SUBMISSION_REASON: &str = "invalid token or backup code";

impl MfaService {
    /// Verifies a login-time MFA submission.
    ///
    /// Order: lockout check, TOTP, then unused backup codes. A lockout
    /// short-circuits before any verification and records nothing.
    pub async fn verify_login(
        &self,
        user_id: UserId,
        submitted_code: &str,
    ) -> AppResult<VerifyOutcome> {
        let lock = self
            .rate_limit_service
            .check_locked(user_id, &self.policy.rate_limit)
            .await?;
        if lock.locked {
            warn!(
                user_id = %user_id,
                remaining_minutes = lock.remaining_minutes,
                "MFA verification refused: locked out"
            );
            return Ok(VerifyOutcome::LockedOut {
                remaining_minutes: lock.remaining_minutes,
            });
        }

        let credential = self.mfa_repository.get_credential(user_id).await?;
        let Some(credential) = credential.filter(MfaCredential::is_enabled) else {
            debug!(user_id = %user_id, "MFA verification without an enabled credential");
            return Ok(VerifyOutcome::NotInitiated);
        };

        let submitted_code = submitted_code.trim();
        let now = self.clock.now();

        if totp::verify(
            &credential.secret().to_bytes(),
            submitted_code,
            unix_seconds(now),
            self.policy.totp_window,
        ) {
            return self.record_success(user_id, AttemptType::Totp, now).await;
        }

        if self.redeem_backup_code(user_id, submitted_code).await? {
            return self
                .record_success(user_id, AttemptType::BackupCode, now)
                .await;
        }

        self.rate_limit_service
            .record_attempt(AttemptRecord::failure(
                user_id,
                AttemptType::Totp,
                INVALID_SUBMISSION_REASON,
                now,
            ))
            .await?;

        warn!(user_id = %user_id, "MFA verification failed");
        Ok(VerifyOutcome::InvalidToken)
    }

    /// Consumes the backup code matching `submitted_code`, if any.
    ///
    /// Returns `false` when no unused code matches or when a concurrent
    /// request redeemed the same code first.
    async fn redeem_backup_code(&self, user_id: UserId, submitted_code: &str) -> AppResult<bool> {
        let submitted_hash = hash_backup_code(submitted_code);
        let backup_codes = self.mfa_repository.get_backup_codes(user_id).await?;

        let matched = backup_codes
            .iter()
            .filter(|code| !code.used)
            .fold(false, |matched, code| {
                constant_time_eq(code.code_hash.as_bytes(), submitted_hash.as_bytes()) || matched
            });

        if !matched {
            return Ok(false);
        }

        let redeemed = self
            .mfa_repository
            .mark_backup_code_used(user_id, &submitted_hash)
            .await?;
        if !redeemed {
            debug!(user_id = %user_id, "backup code already redeemed by a concurrent request");
        }

        Ok(redeemed)
    }

    /// Stamps `last_used_at` on the stored credential and logs the success.
    ///
    /// The credential is updated in place rather than written back from the
    /// copy loaded above, so a `reset` that landed in between stays in
    /// effect and the verification reports `NotInitiated`.
    async fn record_success(
        &self,
        user_id: UserId,
        attempt_type: AttemptType,
        now: DateTime<Utc>,
    ) -> AppResult<VerifyOutcome> {
        let still_enabled = self.mfa_repository.touch_last_used(user_id, now).await?;
        if !still_enabled {
            debug!(user_id = %user_id, "MFA credential reset during verification");
            return Ok(VerifyOutcome::NotInitiated);
        }

        self.rate_limit_service
            .record_attempt(AttemptRecord::success(user_id, attempt_type, now))
            .await?;

        info!(
            user_id = %user_id,
            attempt_type = %attempt_type,
            "MFA verification succeeded"
        );
        Ok(VerifyOutcome::Success {
            method: attempt_type,
        })
    }
}

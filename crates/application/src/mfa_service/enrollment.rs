use tracing::{debug, info, warn};

use vigil_core::{AppError, AppResult};
use vigil_domain::{
    AttemptRecord, AttemptType, MfaCredential, UserId, provisioning_uri, totp,
};

use super::secrets::{generate_backup_codes, generate_secret, hash_backup_code};
use super::*;

impl MfaService {
    /// Starts TOTP enrollment for a user.
    ///
    /// Stores a fresh secret (disabled) and a fresh backup code set, and
    /// returns both with the provisioning URI. MFA becomes active only
    /// after `confirm` succeeds. A pending enrollment is replaced; an
    /// enabled one must be `reset` first.
    pub async fn initiate(&self, user_id: UserId, account_label: &str) -> AppResult<TotpEnrollment> {
        let existing = self.mfa_repository.get_credential(user_id).await?;

        if existing.as_ref().is_some_and(MfaCredential::is_enabled) {
            return Err(AppError::Conflict(
                "MFA is already enabled for this account; reset it before enrolling again"
                    .to_owned(),
            ));
        }

        let secret = generate_secret()?;
        let backup_codes = generate_backup_codes(self.policy.backup_code_count)?;
        let code_hashes: Vec<String> = backup_codes
            .iter()
            .map(|code| hash_backup_code(code))
            .collect();

        // The credential goes first. If the code write then fails, the new
        // secret is never returned, so the pending credential cannot be
        // confirmed and the next `initiate` replaces both.
        let credential = MfaCredential::pending(user_id, secret, self.clock.now());
        self.mfa_repository.put_credential(&credential).await?;
        self.mfa_repository
            .replace_backup_codes(user_id, &code_hashes)
            .await?;

        info!(
            user_id = %user_id,
            replaced_pending = existing.is_some(),
            "MFA enrollment started"
        );

        Ok(TotpEnrollment {
            secret_base32: credential.secret().as_base32().to_owned(),
            provisioning_uri: provisioning_uri(
                &self.policy.issuer,
                account_label,
                credential.secret(),
            ),
            backup_codes,
        })
    }

    /// Confirms enrollment with the first code from the user's authenticator.
    ///
    /// Activation is conditional on the stored credential still being the
    /// pending one whose secret matched. If it was reset or replaced in the
    /// meantime the outcome is `NotInitiated` and nothing is enabled.
    pub async fn confirm(&self, user_id: UserId, token: &str) -> AppResult<ConfirmOutcome> {
        let lock = self
            .rate_limit_service
            .check_locked(user_id, &self.policy.rate_limit)
            .await?;
        if lock.locked {
            warn!(
                user_id = %user_id,
                remaining_minutes = lock.remaining_minutes,
                "MFA enrollment confirmation refused: locked out"
            );
            return Ok(ConfirmOutcome::LockedOut {
                remaining_minutes: lock.remaining_minutes,
            });
        }

        let Some(credential) = self.mfa_repository.get_credential(user_id).await? else {
            return Ok(ConfirmOutcome::NotInitiated);
        };

        if credential.is_enabled() {
            return Err(AppError::Conflict(
                "MFA is already enabled for this account".to_owned(),
            ));
        }

        let now = self.clock.now();
        let valid = totp::verify(
            &credential.secret().to_bytes(),
            token.trim(),
            unix_seconds(now),
            self.policy.totp_window,
        );

        if !valid {
            self.rate_limit_service
                .record_attempt(AttemptRecord::failure(
                    user_id,
                    AttemptType::Totp,
                    "invalid enrollment token",
                    now,
                ))
                .await?;

            warn!(user_id = %user_id, "MFA enrollment confirmation failed");
            return Ok(ConfirmOutcome::InvalidToken);
        }

        let activated = self
            .mfa_repository
            .activate_credential(user_id, credential.secret(), now)
            .await?;
        if !activated {
            // Reset, re-initiated or confirmed by another request since the load.
            debug!(user_id = %user_id, "MFA enrollment superseded before activation");
            return Ok(ConfirmOutcome::NotInitiated);
        }

        self.rate_limit_service
            .record_attempt(AttemptRecord::success(user_id, AttemptType::Totp, now))
            .await?;

        info!(user_id = %user_id, "MFA enabled");
        Ok(ConfirmOutcome::Enabled)
    }

    /// Reports where the user stands in the enrollment flow.
    pub async fn enrollment_state(&self, user_id: UserId) -> AppResult<EnrollmentState> {
        let state = match self.mfa_repository.get_credential(user_id).await? {
            None => EnrollmentState::NotEnrolled,
            Some(credential) if credential.is_enabled() => EnrollmentState::Enabled,
            Some(_) => EnrollmentState::PendingVerification,
        };

        Ok(state)
    }
}

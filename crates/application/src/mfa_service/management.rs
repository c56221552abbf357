use tracing::info;

use vigil_core::{AppError, AppResult};
use vigil_domain::UserId;

use super::secrets::{generate_backup_codes, hash_backup_code};
use super::*;

impl MfaService {
    /// Replaces all backup codes of an enabled credential and returns the
    /// new plaintext codes. Previously issued codes stop working.
    pub async fn regenerate_backup_codes(&self, user_id: UserId) -> AppResult<Vec<String>> {
        let enabled = self
            .mfa_repository
            .get_credential(user_id)
            .await?
            .is_some_and(|credential| credential.is_enabled());

        if !enabled {
            return Err(AppError::Conflict(
                "MFA is not enabled for this account".to_owned(),
            ));
        }

        let codes = generate_backup_codes(self.policy.backup_code_count)?;
        let hashed: Vec<String> = codes.iter().map(|code| hash_backup_code(code)).collect();

        self.mfa_repository
            .replace_backup_codes(user_id, &hashed)
            .await?;

        info!(user_id = %user_id, count = codes.len(), "MFA backup codes regenerated");
        Ok(codes)
    }

    /// Counts backup codes that can still be redeemed.
    pub async fn remaining_backup_codes(&self, user_id: UserId) -> AppResult<usize> {
        let codes = self.mfa_repository.get_backup_codes(user_id).await?;
        Ok(codes.iter().filter(|code| !code.used).count())
    }

    /// Removes the credential and its backup codes so the user can enroll
    /// again. This is the only path that discards an enabled secret; the
    /// caller is responsible for re-authenticating the user first.
    pub async fn reset(&self, user_id: UserId) -> AppResult<()> {
        self.mfa_repository.delete_credential(user_id).await?;

        info!(user_id = %user_id, "MFA reset");
        Ok(())
    }
}

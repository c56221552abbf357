use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use vigil_application::MfaRepository;
use vigil_core::{AppError, AppResult};
use vigil_domain::{BackupCode, MfaCredential, SharedSecret, UserId};

#[derive(Debug, Default)]
struct UserMfaState {
    credential: Option<MfaCredential>,
    backup_codes: Vec<BackupCode>,
}

/// In-memory MFA repository implementation.
///
/// Credential and backup codes of a user live in one map entry behind a
/// single lock, so every port operation is atomic with respect to the
/// others.
#[derive(Debug, Default)]
pub struct InMemoryMfaRepository {
    users: RwLock<HashMap<UserId, UserMfaState>>,
}

impl InMemoryMfaRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MfaRepository for InMemoryMfaRepository {
    async fn get_credential(&self, user_id: UserId) -> AppResult<Option<MfaCredential>> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .and_then(|state| state.credential.clone()))
    }

    async fn put_credential(&self, credential: &MfaCredential) -> AppResult<()> {
        let mut users = self.users.write().await;
        let state = users.entry(credential.user_id()).or_default();

        if state
            .credential
            .as_ref()
            .is_some_and(MfaCredential::is_enabled)
        {
            debug!(
                user_id = %credential.user_id(),
                "refused to replace an enabled MFA credential"
            );
            return Err(AppError::Conflict(format!(
                "MFA credential for user '{}' is enabled and cannot be replaced",
                credential.user_id()
            )));
        }

        state.credential = Some(credential.clone());
        Ok(())
    }

    async fn activate_credential(
        &self,
        user_id: UserId,
        secret: &SharedSecret,
        verified_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut users = self.users.write().await;
        let Some(credential) = users
            .get_mut(&user_id)
            .and_then(|state| state.credential.as_mut())
            .filter(|credential| !credential.is_enabled() && credential.secret() == secret)
        else {
            debug!(user_id = %user_id, "no matching pending MFA credential to activate");
            return Ok(false);
        };

        credential.activate(verified_at)?;
        Ok(true)
    }

    async fn touch_last_used(&self, user_id: UserId, used_at: DateTime<Utc>) -> AppResult<bool> {
        let mut users = self.users.write().await;
        let Some(credential) = users
            .get_mut(&user_id)
            .and_then(|state| state.credential.as_mut())
            .filter(|credential| credential.is_enabled())
        else {
            return Ok(false);
        };

        credential.record_use(used_at);
        Ok(true)
    }

    async fn delete_credential(&self, user_id: UserId) -> AppResult<()> {
        self.users.write().await.remove(&user_id);
        Ok(())
    }

    async fn get_backup_codes(&self, user_id: UserId) -> AppResult<Vec<BackupCode>> {
        Ok(self
            .users
            .read()
            .await
            .get(&user_id)
            .map(|state| state.backup_codes.clone())
            .unwrap_or_default())
    }

    async fn replace_backup_codes(
        &self,
        user_id: UserId,
        code_hashes: &[String],
    ) -> AppResult<()> {
        let mut users = self.users.write().await;
        users.entry(user_id).or_default().backup_codes =
            code_hashes.iter().map(BackupCode::unused).collect();
        Ok(())
    }

    async fn mark_backup_code_used(&self, user_id: UserId, code_hash: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        let Some(code) = users.get_mut(&user_id).and_then(|state| {
            state
                .backup_codes
                .iter_mut()
                .find(|code| !code.used && code.code_hash == code_hash)
        }) else {
            return Ok(false);
        };

        code.used = true;
        Ok(true)
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Barrier, Mutex};

use vigil_core::{AppError, AppResult};
use vigil_domain::{
    AttemptRecord, AttemptType, BackupCode, MfaCredential, SharedSecret, UserId,
};

use crate::{AttemptRepository, Clock, MfaRepository};

#[derive(Default)]
pub(crate) struct FakeMfaRepository {
    credentials: Mutex<HashMap<UserId, MfaCredential>>,
    backup_codes: Mutex<HashMap<UserId, Vec<BackupCode>>>,
}

impl FakeMfaRepository {
    pub(crate) async fn credential(&self, user_id: UserId) -> Option<MfaCredential> {
        self.credentials.lock().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl MfaRepository for FakeMfaRepository {
    async fn get_credential(&self, user_id: UserId) -> AppResult<Option<MfaCredential>> {
        Ok(self.credentials.lock().await.get(&user_id).cloned())
    }

    async fn put_credential(&self, credential: &MfaCredential) -> AppResult<()> {
        let mut credentials = self.credentials.lock().await;
        if credentials
            .get(&credential.user_id())
            .is_some_and(MfaCredential::is_enabled)
        {
            return Err(AppError::Conflict("credential is enabled".to_owned()));
        }
        credentials.insert(credential.user_id(), credential.clone());
        Ok(())
    }

    async fn activate_credential(
        &self,
        user_id: UserId,
        secret: &SharedSecret,
        verified_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut credentials = self.credentials.lock().await;
        match credentials.get_mut(&user_id) {
            Some(credential) if !credential.is_enabled() && credential.secret() == secret => {
                credential.activate(verified_at)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_used(&self, user_id: UserId, used_at: DateTime<Utc>) -> AppResult<bool> {
        let mut credentials = self.credentials.lock().await;
        match credentials.get_mut(&user_id) {
            Some(credential) if credential.is_enabled() => {
                credential.record_use(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_credential(&self, user_id: UserId) -> AppResult<()> {
        self.credentials.lock().await.remove(&user_id);
        self.backup_codes.lock().await.remove(&user_id);
        Ok(())
    }

    async fn get_backup_codes(&self, user_id: UserId) -> AppResult<Vec<BackupCode>> {
        Ok(self
            .backup_codes
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_backup_codes(
        &self,
        user_id: UserId,
        code_hashes: &[String],
    ) -> AppResult<()> {
        let codes = code_hashes.iter().map(BackupCode::unused).collect();
        self.backup_codes.lock().await.insert(user_id, codes);
        Ok(())
    }

    async fn mark_backup_code_used(&self, user_id: UserId, code_hash: &str) -> AppResult<bool> {
        let mut backup_codes = self.backup_codes.lock().await;
        let Some(code) = backup_codes
            .get_mut(&user_id)
            .and_then(|codes| codes.iter_mut().find(|code| code.code_hash == code_hash))
        else {
            return Ok(false);
        };

        if code.used {
            return Ok(false);
        }
        code.used = true;
        Ok(true)
    }
}

/// Change applied to the store right after the next `get_credential`.
pub(crate) enum Interference {
    /// A concurrent `reset`.
    Reset,
    /// A concurrent `initiate` that stored this pending credential.
    Reenroll(MfaCredential),
}

/// Delegates to a [`FakeMfaRepository`] and lets another request change the
/// stored credential between a service's load and its write.
pub(crate) struct InterleavingMfaRepository {
    inner: Arc<FakeMfaRepository>,
    pending: Mutex<Option<Interference>>,
}

impl InterleavingMfaRepository {
    pub(crate) fn new(inner: Arc<FakeMfaRepository>) -> Self {
        Self {
            inner,
            pending: Mutex::new(None),
        }
    }

    pub(crate) async fn interfere_after_next_load(&self, interference: Interference) {
        *self.pending.lock().await = Some(interference);
    }
}

#[async_trait]
impl MfaRepository for InterleavingMfaRepository {
    async fn get_credential(&self, user_id: UserId) -> AppResult<Option<MfaCredential>> {
        let loaded = self.inner.get_credential(user_id).await?;

        let interference = self.pending.lock().await.take();
        match interference {
            Some(Interference::Reset) => self.inner.delete_credential(user_id).await?,
            Some(Interference::Reenroll(credential)) => {
                self.inner.put_credential(&credential).await?;
            }
            None => {}
        }

        Ok(loaded)
    }

    async fn put_credential(&self, credential: &MfaCredential) -> AppResult<()> {
        self.inner.put_credential(credential).await
    }

    async fn activate_credential(
        &self,
        user_id: UserId,
        secret: &SharedSecret,
        verified_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner
            .activate_credential(user_id, secret, verified_at)
            .await
    }

    async fn touch_last_used(&self, user_id: UserId, used_at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.touch_last_used(user_id, used_at).await
    }

    async fn delete_credential(&self, user_id: UserId) -> AppResult<()> {
        self.inner.delete_credential(user_id).await
    }

    async fn get_backup_codes(&self, user_id: UserId) -> AppResult<Vec<BackupCode>> {
        self.inner.get_backup_codes(user_id).await
    }

    async fn replace_backup_codes(
        &self,
        user_id: UserId,
        code_hashes: &[String],
    ) -> AppResult<()> {
        self.inner.replace_backup_codes(user_id, code_hashes).await
    }

    async fn mark_backup_code_used(&self, user_id: UserId, code_hash: &str) -> AppResult<bool> {
        self.inner.mark_backup_code_used(user_id, code_hash).await
    }
}

/// Delegates to a [`FakeMfaRepository`] but holds every `get_backup_codes`
/// caller at a barrier after reading, so concurrent verifications all act
/// on the same snapshot of unused codes.
pub(crate) struct SnapshotBarrierMfaRepository {
    inner: Arc<FakeMfaRepository>,
    barrier: Barrier,
}

impl SnapshotBarrierMfaRepository {
    pub(crate) fn new(inner: Arc<FakeMfaRepository>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl MfaRepository for SnapshotBarrierMfaRepository {
    async fn get_credential(&self, user_id: UserId) -> AppResult<Option<MfaCredential>> {
        self.inner.get_credential(user_id).await
    }

    async fn put_credential(&self, credential: &MfaCredential) -> AppResult<()> {
        self.inner.put_credential(credential).await
    }

    async fn activate_credential(
        &self,
        user_id: UserId,
        secret: &SharedSecret,
        verified_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner
            .activate_credential(user_id, secret, verified_at)
            .await
    }

    async fn touch_last_used(&self, user_id: UserId, used_at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.touch_last_used(user_id, used_at).await
    }

    async fn delete_credential(&self, user_id: UserId) -> AppResult<()> {
        self.inner.delete_credential(user_id).await
    }

    async fn get_backup_codes(&self, user_id: UserId) -> AppResult<Vec<BackupCode>> {
        let snapshot = self.inner.get_backup_codes(user_id).await?;
        self.barrier.wait().await;
        Ok(snapshot)
    }

    async fn replace_backup_codes(
        &self,
        user_id: UserId,
        code_hashes: &[String],
    ) -> AppResult<()> {
        self.inner.replace_backup_codes(user_id, code_hashes).await
    }

    async fn mark_backup_code_used(&self, user_id: UserId, code_hash: &str) -> AppResult<bool> {
        self.inner.mark_backup_code_used(user_id, code_hash).await
    }
}

/// Delegates to a [`FakeMfaRepository`] but fails every backup code write.
pub(crate) struct FailingBackupCodeWrites {
    inner: Arc<FakeMfaRepository>,
}

impl FailingBackupCodeWrites {
    pub(crate) fn new(inner: Arc<FakeMfaRepository>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MfaRepository for FailingBackupCodeWrites {
    async fn get_credential(&self, user_id: UserId) -> AppResult<Option<MfaCredential>> {
        self.inner.get_credential(user_id).await
    }

    async fn put_credential(&self, credential: &MfaCredential) -> AppResult<()> {
        self.inner.put_credential(credential).await
    }

    async fn activate_credential(
        &self,
        user_id: UserId,
        secret: &SharedSecret,
        verified_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner
            .activate_credential(user_id, secret, verified_at)
            .await
    }

    async fn touch_last_used(&self, user_id: UserId, used_at: DateTime<Utc>) -> AppResult<bool> {
        self.inner.touch_last_used(user_id, used_at).await
    }

    async fn delete_credential(&self, user_id: UserId) -> AppResult<()> {
        self.inner.delete_credential(user_id).await
    }

    async fn get_backup_codes(&self, user_id: UserId) -> AppResult<Vec<BackupCode>> {
        self.inner.get_backup_codes(user_id).await
    }

    async fn replace_backup_codes(
        &self,
        _user_id: UserId,
        _code_hashes: &[String],
    ) -> AppResult<()> {
        Err(AppError::Storage("backup code store unavailable".to_owned()))
    }

    async fn mark_backup_code_used(&self, user_id: UserId, code_hash: &str) -> AppResult<bool> {
        self.inner.mark_backup_code_used(user_id, code_hash).await
    }
}

#[derive(Default)]
pub(crate) struct FakeAttemptRepository {
    attempts: Mutex<Vec<AttemptRecord>>,
}

impl FakeAttemptRepository {
    pub(crate) async fn attempts(&self) -> Vec<AttemptRecord> {
        self.attempts.lock().await.clone()
    }

    pub(crate) async fn count_of(&self, attempt_type: AttemptType, success: bool) -> usize {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|record| record.attempt_type == attempt_type && record.success == success)
            .count()
    }
}

#[async_trait]
impl AttemptRepository for FakeAttemptRepository {
    async fn append_attempt(&self, record: AttemptRecord) -> AppResult<()> {
        self.attempts.lock().await.push(record);
        Ok(())
    }

    async fn count_recent_failures(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<u32> {
        let count = self
            .attempts
            .lock()
            .await
            .iter()
            .filter(|record| {
                record.user_id == user_id && !record.success && record.occurred_at >= since
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn oldest_recent_failure(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .attempts
            .lock()
            .await
            .iter()
            .filter(|record| {
                record.user_id == user_id && !record.success && record.occurred_at >= since
            })
            .map(|record| record.occurred_at)
            .min())
    }
}

pub(crate) struct FailingAttemptRepository;

#[async_trait]
impl AttemptRepository for FailingAttemptRepository {
    async fn append_attempt(&self, _record: AttemptRecord) -> AppResult<()> {
        Err(AppError::Storage("attempt log unavailable".to_owned()))
    }

    async fn count_recent_failures(
        &self,
        _user_id: UserId,
        _since: DateTime<Utc>,
    ) -> AppResult<u32> {
        Err(AppError::Storage("attempt log unavailable".to_owned()))
    }

    async fn oldest_recent_failure(
        &self,
        _user_id: UserId,
        _since: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        Err(AppError::Storage("attempt log unavailable".to_owned()))
    }
}

/// Clock pinned to a settable unix timestamp.
pub(crate) struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    pub(crate) fn at(unix_seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(unix_seconds),
        }
    }

    pub(crate) fn advance_seconds(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    pub(crate) fn unix_seconds(&self) -> u64 {
        u64::try_from(self.seconds.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

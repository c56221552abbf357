//! Persistence and time ports consumed by the MFA services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vigil_core::AppResult;
use vigil_domain::{AttemptRecord, BackupCode, MfaCredential, SharedSecret, UserId};

/// Repository port for MFA credentials and their backup codes.
///
/// Adapters report their own failures as `AppError::Storage` with enough
/// context to diagnose, never including secret material.
#[async_trait]
pub trait MfaRepository: Send + Sync {
    /// Loads the credential for a user, if one exists.
    async fn get_credential(&self, user_id: UserId) -> AppResult<Option<MfaCredential>>;

    /// Stores a credential, replacing a pending one.
    ///
    /// Must be rejected with `AppError::Conflict` while the stored
    /// credential is enabled; that path goes through `delete_credential`.
    async fn put_credential(&self, credential: &MfaCredential) -> AppResult<()>;

    /// Conditionally enables the stored credential.
    ///
    /// The transition happens only if a pending credential with exactly
    /// `secret` is stored; it sets `is_enabled`, `verified_at` and
    /// `last_used_at`. Returns `true` only for the call that performed it,
    /// so a confirmation never enables a secret that was replaced or reset
    /// after it was loaded.
    async fn activate_credential(
        &self,
        user_id: UserId,
        secret: &SharedSecret,
        verified_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Updates `last_used_at` of an enabled credential in place.
    ///
    /// Returns `false` when no enabled credential exists anymore; a stored
    /// row is never recreated.
    async fn touch_last_used(&self, user_id: UserId, used_at: DateTime<Utc>) -> AppResult<bool>;

    /// Removes the credential and all backup codes of a user.
    async fn delete_credential(&self, user_id: UserId) -> AppResult<()>;

    /// Lists the backup codes of a user, used ones included.
    async fn get_backup_codes(&self, user_id: UserId) -> AppResult<Vec<BackupCode>>;

    /// Atomically replaces the whole backup code set with fresh unused codes.
    async fn replace_backup_codes(&self, user_id: UserId, code_hashes: &[String])
    -> AppResult<()>;

    /// Conditionally marks a code used (`used = false -> true`).
    ///
    /// Returns `true` only for the call that performed the transition, so
    /// concurrent redemptions of the same code have exactly one winner.
    async fn mark_backup_code_used(&self, user_id: UserId, code_hash: &str) -> AppResult<bool>;
}

/// Append-only repository port for verification attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Appends an attempt record.
    async fn append_attempt(&self, record: AttemptRecord) -> AppResult<()>;

    /// Counts failed attempts for a user at or after `since`.
    async fn count_recent_failures(&self, user_id: UserId, since: DateTime<Utc>)
    -> AppResult<u32>;

    /// Returns the earliest failed attempt for a user at or after `since`.
    async fn oldest_recent_failure(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>>;
}

/// Source of the current time, injected so TOTP steps and lockout windows
/// can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

//! MFA credential and backup code records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{AppError, AppResult, base32};

use crate::UserId;

/// Minimum decoded secret length in bytes (80 bits). Generated secrets
/// carry 160.
pub const MIN_SECRET_BYTES: usize = 10;

/// Second factor kind. Only TOTP is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMethod {
    /// RFC 6238 authenticator app codes.
    Totp,
}

impl MfaMethod {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
        }
    }
}

/// Base32-encoded TOTP shared secret.
///
/// `Debug` never prints the value so credentials can appear in logs and
/// error contexts safely.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(String);

impl SharedSecret {
    /// Wraps base32 text, normalizing it to the unpadded uppercase form.
    ///
    /// Separators such as spaces and dashes are dropped, so a secret
    /// pasted in groups is stored as one run of base32 characters.
    pub fn new(value: impl AsRef<str>) -> AppResult<Self> {
        let normalized = base32::normalize(value.as_ref());

        if base32::decode(&normalized).len() < MIN_SECRET_BYTES {
            return Err(AppError::Validation(format!(
                "MFA secret must decode to at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the base32 text as stored and shown to the user.
    #[must_use]
    pub fn as_base32(&self) -> &str {
        self.0.as_str()
    }

    /// Decodes the secret into HMAC key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        base32::decode(&self.0)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("SharedSecret(<redacted>)")
    }
}

/// Stored fields of a credential, used by persistence adapters to
/// rehydrate a [`MfaCredential`].
#[derive(Debug, Clone)]
pub struct MfaCredentialParts {
    /// Owner of the credential.
    pub user_id: UserId,
    /// Shared secret.
    pub secret: SharedSecret,
    /// Second factor kind.
    pub method: MfaMethod,
    /// Whether the credential is active for login.
    pub is_enabled: bool,
    /// First successful verification.
    pub verified_at: Option<DateTime<Utc>>,
    /// Latest successful verification.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Enrollment start.
    pub created_at: DateTime<Utc>,
}

/// Per-user MFA credential.
///
/// A credential is enabled only after its first successful verification;
/// `is_enabled()` therefore implies `verified_at().is_some()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaCredential {
    user_id: UserId,
    secret: SharedSecret,
    method: MfaMethod,
    is_enabled: bool,
    verified_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MfaCredential {
    /// Creates an unverified TOTP credential at enrollment start.
    #[must_use]
    pub fn pending(user_id: UserId, secret: SharedSecret, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            secret,
            method: MfaMethod::Totp,
            is_enabled: false,
            verified_at: None,
            last_used_at: None,
            created_at: now,
        }
    }

    /// Rehydrates a stored credential, rejecting rows that break the
    /// enabled-implies-verified invariant.
    pub fn from_parts(parts: MfaCredentialParts) -> AppResult<Self> {
        if parts.is_enabled && parts.verified_at.is_none() {
            return Err(AppError::Validation(format!(
                "MFA credential for user '{}' is enabled but was never verified",
                parts.user_id
            )));
        }

        Ok(Self {
            user_id: parts.user_id,
            secret: parts.secret,
            method: parts.method,
            is_enabled: parts.is_enabled,
            verified_at: parts.verified_at,
            last_used_at: parts.last_used_at,
            created_at: parts.created_at,
        })
    }

    /// Marks the credential verified and enabled. Allowed exactly once.
    pub fn activate(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.is_enabled {
            return Err(AppError::Conflict(
                "MFA is already enabled for this account".to_owned(),
            ));
        }

        self.is_enabled = true;
        self.verified_at = Some(now);
        self.last_used_at = Some(now);
        Ok(())
    }

    /// Records a successful login-time verification.
    pub fn record_use(&mut self, now: DateTime<Utc>) {
        self.last_used_at = Some(now);
    }

    /// Returns the owning user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the shared secret.
    #[must_use]
    pub fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    /// Returns the second factor kind.
    #[must_use]
    pub fn method(&self) -> MfaMethod {
        self.method
    }

    /// Returns whether the credential is active for login.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    /// Returns when the credential was first verified.
    #[must_use]
    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// Returns when the credential was last used successfully.
    #[must_use]
    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    /// Returns when enrollment started.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Stored backup code. Only the hash is kept; `used` never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupCode {
    /// One-way hash of the plaintext code.
    pub code_hash: String,
    /// Whether the code has been redeemed.
    pub used: bool,
}

impl BackupCode {
    /// Creates an unused backup code from its hash.
    #[must_use]
    pub fn unused(code_hash: impl Into<String>) -> Self {
        Self {
            code_hash: code_hash.into(),
            used: false,
        }
    }
}

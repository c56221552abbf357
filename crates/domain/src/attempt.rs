//! Append-only verification attempt log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Which factor a verification attempt was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptType {
    /// Authenticator app code.
    Totp,
    /// Single-use recovery code.
    BackupCode,
}

impl AttemptType {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::BackupCode => "backup_code",
        }
    }
}

impl std::fmt::Display for AttemptType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One verification outcome. Records are appended and read back over a
/// trailing window; they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// User the attempt was made for.
    pub user_id: UserId,
    /// Factor the attempt was checked against.
    pub attempt_type: AttemptType,
    /// Whether verification succeeded.
    pub success: bool,
    /// Why verification failed, for failed attempts.
    pub failure_reason: Option<String>,
    /// When the attempt happened.
    pub occurred_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Creates a successful attempt record.
    #[must_use]
    pub fn success(user_id: UserId, attempt_type: AttemptType, occurred_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            attempt_type,
            success: true,
            failure_reason: None,
            occurred_at,
        }
    }

    /// Creates a failed attempt record.
    #[must_use]
    pub fn failure(
        user_id: UserId,
        attempt_type: AttemptType,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            attempt_type,
            success: false,
            failure_reason: Some(reason.into()),
            occurred_at,
        }
    }
}

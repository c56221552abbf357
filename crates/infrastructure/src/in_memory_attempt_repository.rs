use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use vigil_application::AttemptRepository;
use vigil_core::AppResult;
use vigil_domain::{AttemptRecord, UserId};

/// In-memory, append-only attempt log.
#[derive(Debug, Default)]
pub struct InMemoryAttemptRepository {
    records: RwLock<Vec<AttemptRecord>>,
}

impl InMemoryAttemptRepository {
    /// Creates an empty attempt log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Returns every record of a user in append order.
    pub async fn list_for_user(&self, user_id: UserId) -> Vec<AttemptRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn is_recent_failure(record: &AttemptRecord, user_id: UserId, since: DateTime<Utc>) -> bool {
    record.user_id == user_id && !record.success && record.occurred_at >= since
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn append_attempt(&self, record: AttemptRecord) -> AppResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn count_recent_failures(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<u32> {
        let count = self
            .records
            .read()
            .await
            .iter()
            .filter(|record| is_recent_failure(record, user_id, since))
            .count();

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn oldest_recent_failure(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|record| is_recent_failure(record, user_id, since))
            .map(|record| record.occurred_at)
            .min())
    }
}

use crate::application_port::NotificationError;
use crate::domain_model::{Notification, NotificationId, UserId};

#[async_trait::async_trait]
pub trait NotificationRepo: Send + Sync {
    /// Insert guarded by a unique dedup key; returns `false` when a row with
    /// the same key already exists. At-least-once consumers lean on this to
    /// keep redelivered events from duplicating their visible side effect.
    async fn insert_once(
        &self,
        user_id: UserId,
        kind: &str,
        title: &str,
        body: &str,
        dedup_key: &str,
    ) -> Result<bool, NotificationError>;

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, NotificationError>;

    async fn mark_read(&self, user_id: UserId, id: NotificationId)
    -> Result<(), NotificationError>;
}

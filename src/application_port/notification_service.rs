use crate::domain_model::{Notification, NotificationId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification not found")]
    NotFound,
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, NotificationError>;

    async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), NotificationError>;
}

use crate::application_port::{NotificationError, NotificationService};
use crate::domain_model::{Notification, NotificationId, UserId};
use crate::domain_port::NotificationRepo;
use std::sync::Arc;

const PAGE_LIMIT: u32 = 50;

pub struct RealNotificationService {
    notification_repo: Arc<dyn NotificationRepo>,
}

impl RealNotificationService {
    pub fn new(notification_repo: Arc<dyn NotificationRepo>) -> Self {
        Self { notification_repo }
    }
}

#[async_trait::async_trait]
impl NotificationService for RealNotificationService {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, NotificationError> {
        self.notification_repo
            .list_for_user(user_id, PAGE_LIMIT)
            .await
    }

    async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), NotificationError> {
        self.notification_repo.mark_read(user_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryNotificationRepo;

    #[tokio::test]
    async fn test_mark_read_flips_the_seen_flag_for_the_owner_only() {
        let repo = Arc::new(MemoryNotificationRepo::new());
        let service = RealNotificationService::new(repo.clone());
        let owner = UserId(uuid::Uuid::new_v4());
        let stranger = UserId(uuid::Uuid::new_v4());

        repo.insert_once(owner, "welcome", "t", "b", "welcome:test")
            .await
            .unwrap();
        let listed = service.list_for_user(owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_read);
        let id = listed[0].id;

        let err = service.mark_read(stranger, id).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotFound));

        service.mark_read(owner, id).await.unwrap();
        let listed = service.list_for_user(owner).await.unwrap();
        assert!(listed[0].is_read);
    }
}

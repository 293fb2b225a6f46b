use crate::application_port::NotificationError;
use crate::domain_model::{Notification, NotificationId, UserId};
use crate::domain_port::NotificationRepo;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Mutex;

pub struct MemoryNotificationRepo {
    dedup: DashMap<String, ()>,
    rows: Mutex<Vec<Notification>>,
}

impl MemoryNotificationRepo {
    pub fn new() -> Self {
        Self {
            dedup: DashMap::new(),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn count_for_user(&self, user_id: UserId) -> usize {
        self.rows
            .lock()
            .expect("notification rows lock")
            .iter()
            .filter(|n| n.user_id == user_id)
            .count()
    }
}

impl Default for MemoryNotificationRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationRepo for MemoryNotificationRepo {
    async fn insert_once(
        &self,
        user_id: UserId,
        kind: &str,
        title: &str,
        body: &str,
        dedup_key: &str,
    ) -> Result<bool, NotificationError> {
        match self.dedup.entry(dedup_key.to_string()) {
            Entry::Occupied(_) => return Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(());
            }
        }

        let notification = Notification {
            id: NotificationId(uuid::Uuid::new_v4()),
            user_id,
            kind: kind.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.rows
            .lock()
            .expect("notification rows lock")
            .push(notification);
        Ok(true)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut rows: Vec<Notification> = self
            .rows
            .lock()
            .expect("notification rows lock")
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|n| std::cmp::Reverse(n.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), NotificationError> {
        let mut rows = self.rows.lock().expect("notification rows lock");
        let row = rows
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(NotificationError::NotFound)?;
        row.is_read = true;
        Ok(())
    }
}

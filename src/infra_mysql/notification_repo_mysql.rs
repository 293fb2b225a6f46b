use crate::application_port::NotificationError;
use crate::domain_model::{Notification, NotificationId, UserId};
use crate::domain_port::NotificationRepo;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlNotificationRepo {
    pool: MySqlPool,
}

impl MySqlNotificationRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlNotificationRepo { pool }
    }

    fn row_to_notification(r: &MySqlRow) -> Notification {
        Notification {
            id: r.get::<NotificationId, _>("id"),
            user_id: r.get::<UserId, _>("user_id"),
            kind: r.get("kind"),
            title: r.get("title"),
            body: r.get("body"),
            is_read: r.get("is_read"),
            created_at: r.get::<DateTime<Utc>, _>("created_at"),
        }
    }
}

#[async_trait::async_trait]
impl NotificationRepo for MySqlNotificationRepo {
    async fn insert_once(
        &self,
        user_id: UserId,
        kind: &str,
        title: &str,
        body: &str,
        dedup_key: &str,
    ) -> Result<bool, NotificationError> {
        // dedup_key is unique; a duplicate turns the insert into a no-op and
        // rows_affected reports 0
        let result = sqlx::query(
            r#"
INSERT INTO notifications (id, user_id, kind, title, body, dedup_key, is_read, created_at)
VALUES (?, ?, ?, ?, ?, ?, 0, ?)
ON DUPLICATE KEY UPDATE id = id
"#,
        )
        .bind(NotificationId(uuid::Uuid::new_v4()))
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(body)
        .bind(dedup_key)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| NotificationError::Unavailable(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, NotificationError> {
        let rows = sqlx::query(
            r#"
SELECT id, user_id, kind, title, body, is_read, created_at
FROM notifications
WHERE user_id = ?
ORDER BY created_at DESC
LIMIT ?
"#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NotificationError::Unavailable(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_notification).collect())
    }

    async fn mark_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<(), NotificationError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| NotificationError::Unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }
}

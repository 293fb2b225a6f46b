use super::util::downcast;
use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

pub struct MySqlRefreshTokenRepo {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenRepo { pool }
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MySqlRefreshTokenRepo {
    async fn insert_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO refresh_tokens (user_id, token, expires_at)
VALUES (?, ?, ?)
"#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(tx.conn())
        .await
        .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn consume_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let tx = downcast(tx);

        // Exactly one of two concurrent rotations removes the row; the other
        // deletes nothing and reports the token as already consumed.
        let result = sqlx::query(
            r#"
DELETE FROM refresh_tokens
WHERE token = ? AND expires_at > ?
"#,
        )
        .bind(token)
        .bind(now)
        .execute(tx.conn())
        .await
        .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(())
    }
}

use super::util::{downcast, is_dup_key};
use crate::application_port::AuthError;
use crate::domain_model::{Principal, Role, UserId};
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::MySqlRow;
use sqlx::{Database, Decode, Encode, MySqlPool, Row, Type};
use std::str::FromStr;

impl<'r, DB: Database> Decode<'r, DB> for Role
where
    &'r str: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<DB>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for Role
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        self.to_string().encode_by_ref(buf)
    }
}

impl<DB: Database> Type<DB> for Role
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        <String as Type<DB>>::type_info()
    }
}

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(r: &MySqlRow) -> Result<UserRecord, AuthError> {
        let role_str = r.get::<&str, _>("role");
        let role = Role::from_str(role_str).map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(UserRecord {
            user_id: r.get::<UserId, _>("user_id"),
            email: r.get("email"),
            password_hash: r.get("password_hash"),
            first_name: r.get("first_name"),
            last_name: r.get("last_name"),
            phone: r.get("phone"),
            role,
            is_active: r.get("is_active"),
            created_at: r.get::<DateTime<Utc>, _>("created_at"),
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        record: &UserRecord,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO users (user_id, email, password_hash, first_name, last_name, phone, role, is_active, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(record.user_id)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.phone)
        .bind(record.role)
        .bind(record.is_active)
        .bind(record.created_at)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::EmailTaken
            } else {
                AuthError::Unavailable(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT user_id, email, password_hash, first_name, last_name, phone, role, is_active, created_at
FROM users
WHERE email = ?
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        row.map(|r| Self::row_to_record(&r)).transpose()
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT user_id, email, password_hash, first_name, last_name, phone, role, is_active, created_at
FROM users
WHERE user_id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        row.map(|r| Self::row_to_record(&r)).transpose()
    }

    async fn get_principal(&self, user_id: UserId) -> Result<Option<Principal>, AuthError> {
        let row = sqlx::query("SELECT user_id, role FROM users WHERE user_id = ? AND is_active = 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        row.map(|r| {
            let role_str = r.get::<&str, _>("role");
            let role = Role::from_str(role_str).map_err(|e| AuthError::Internal(e.to_string()))?;
            Ok(Principal {
                id: r.get::<UserId, _>("user_id"),
                role,
            })
        })
        .transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        Ok(row.is_some())
    }
}

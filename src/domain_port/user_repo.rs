use crate::application_port::AuthError;
use crate::domain_model::{Principal, Role, UserId};
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        record: &UserRecord,
    ) -> Result<(), AuthError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    /// Current principal for token reissue; `None` for missing or disabled
    /// accounts. Rotation reads this so a role change lands in the next
    /// access token.
    async fn get_principal(&self, user_id: UserId) -> Result<Option<Principal>, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;
}

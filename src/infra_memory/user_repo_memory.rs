use crate::application_port::AuthError;
use crate::domain_model::{Principal, UserId};
use crate::domain_port::{StorageTx, UserRecord, UserRepo};
use dashmap::DashMap;

pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    pub fn insert(&self, record: UserRecord) {
        self.users.insert(record.user_id, record);
    }

    pub fn set_active(&self, user_id: UserId, is_active: bool) {
        if let Some(mut record) = self.users.get_mut(&user_id) {
            record.is_active = is_active;
        }
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        record: &UserRecord,
    ) -> Result<(), AuthError> {
        self.users.insert(record.user_id, record.clone());
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().email == email)
            .map(|e| e.value().clone()))
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(&user_id).map(|e| e.value().clone()))
    }

    async fn get_principal(&self, user_id: UserId) -> Result<Option<Principal>, AuthError> {
        Ok(self
            .users
            .get(&user_id)
            .filter(|e| e.value().is_active)
            .map(|e| Principal {
                id: e.value().user_id,
                role: e.value().role,
            }))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.users.iter().any(|e| e.value().email == email))
    }
}

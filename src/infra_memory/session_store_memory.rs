use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::SessionStore;
use dashmap::DashMap;

pub struct MemorySessionStore {
    sessions: DashMap<UserId, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn current_jti(&self, user_id: UserId) -> Option<String> {
        self.sessions.get(&user_id).map(|e| e.value().clone())
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put_session(
        &self,
        user_id: UserId,
        jti: &str,
        _ttl_secs: u64,
    ) -> Result<(), AuthError> {
        self.sessions.insert(user_id, jti.to_string());
        Ok(())
    }

    async fn clear_session(&self, user_id: UserId) -> Result<(), AuthError> {
        self.sessions.remove(&user_id);
        Ok(())
    }
}

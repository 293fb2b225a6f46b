use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{RefreshTokenRepo, StorageTx};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

pub struct MemoryRefreshTokenRepo {
    records: DashMap<String, (UserId, DateTime<Utc>)>,
}

impl MemoryRefreshTokenRepo {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.records.contains_key(token)
    }

    pub fn expires_at(&self, token: &str) -> Option<DateTime<Utc>> {
        self.records.get(token).map(|e| e.value().1)
    }
}

impl Default for MemoryRefreshTokenRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MemoryRefreshTokenRepo {
    async fn insert_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.records.insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn consume_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        // single atomic conditional remove; two concurrent callers cannot
        // both observe a removal
        Ok(self
            .records
            .remove_if(token, |_, (_, expires_at)| *expires_at > now)
            .is_some())
    }

    async fn delete(&self, token: &str) -> Result<(), AuthError> {
        self.records.remove(token);
        Ok(())
    }
}

use crate::domain_port::{CacheError, ReadCache};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisReadCache {
    conn: ConnectionManager,
}

impl RedisReadCache {
    pub fn new(conn: ConnectionManager) -> Self {
        RedisReadCache { conn }
    }
}

#[async_trait::async_trait]
impl ReadCache for RedisReadCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        if !keys.is_empty() {
            let _: () = conn
                .del(keys)
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }
}

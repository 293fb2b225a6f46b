#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Cache-aside store for serialized read models. Entries are advisory: a miss
/// never means "does not exist", and callers must tolerate the whole cache
/// being down (fall through to the source of truth, skip populating).
#[async_trait::async_trait]
pub trait ReadCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Exact-key invalidation, for detail-view entries.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Pattern invalidation (`listings:*`), for the unbounded set of cached
    /// collection views a write may touch. Coarse on purpose.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError>;
}

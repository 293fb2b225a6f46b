use crate::domain_port::{CacheError, ReadCache};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// `*`-only glob, the subset of KEYS patterns the invalidation paths use.
fn glob_match(pattern: &str, key: &str) -> bool {
    let mut remainder = key;
    let mut parts = pattern.split('*');

    let Some(first) = parts.next() else {
        return pattern == key;
    };
    if !remainder.starts_with(first) {
        return false;
    }
    remainder = &remainder[first.len()..];

    let mut last: Option<&str> = None;
    for part in parts {
        if let Some(prev) = last.take() {
            match remainder.find(prev) {
                Some(idx) => remainder = &remainder[idx + prev.len()..],
                None => return false,
            }
        }
        last = Some(part);
    }

    match last {
        // pattern had no '*': exact match required
        None => remainder.is_empty(),
        Some(tail) => tail.is_empty() || remainder.ends_with(tail),
    }
}

pub struct MemoryReadCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryReadCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryReadCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReadCache for MemoryReadCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        // clone out before touching the map again; removing while a shard
        // guard is held would deadlock
        let hit = self.entries.get(key).map(|entry| entry.value().clone());
        match hit {
            Some((value, deadline)) if deadline > Instant::now() => Ok(Some(value)),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        self.entries.retain(|key, _| !glob_match(pattern, key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let cache = MemoryReadCache::new();

        cache.set("listing:1", "a", 60).await.unwrap();
        assert_eq!(cache.get("listing:1").await.unwrap(), Some("a".to_string()));

        cache.invalidate("listing:1").await.unwrap();
        assert_eq!(cache.get("listing:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_absent_key_is_a_miss() {
        let cache = MemoryReadCache::new();
        assert_eq!(cache.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pattern_invalidation_spares_other_keys() {
        let cache = MemoryReadCache::new();

        cache.set("listings:abc", "page1", 60).await.unwrap();
        cache.set("listings:def", "page2", 60).await.unwrap();
        cache.set("listing:1", "detail", 60).await.unwrap();

        cache.invalidate_pattern("listings:*").await.unwrap();

        assert_eq!(cache.get("listings:abc").await.unwrap(), None);
        assert_eq!(cache.get("listings:def").await.unwrap(), None);
        assert_eq!(
            cache.get("listing:1").await.unwrap(),
            Some("detail".to_string())
        );
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MemoryReadCache::new();

        cache.set("temp", "x", 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("temp").await.unwrap(), None);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("listings:*", "listings:abc"));
        assert!(glob_match("listings:*", "listings:"));
        assert!(!glob_match("listings:*", "listing:1"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
        assert!(glob_match("a*c", "abc"));
        assert!(!glob_match("a*c", "abd"));
    }
}

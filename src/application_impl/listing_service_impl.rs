use crate::application_port::{ListingError, ListingService};
use crate::bus::{EventPublisher, detach};
use crate::domain_model::*;
use crate::domain_port::{ListingRepo, ReadCache};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

fn detail_key(id: ListingId) -> String {
    format!("listing:{id}")
}

fn search_key(query: &SearchQuery) -> String {
    format!("listings:{}", query.fingerprint())
}

const SEARCH_PATTERN: &str = "listings:*";

pub struct RealListingService {
    listing_repo: Arc<dyn ListingRepo>,
    cache: Arc<dyn ReadCache>,
    publisher: Arc<dyn EventPublisher>,
    detail_ttl_secs: u64,
    search_ttl_secs: u64,
}

impl RealListingService {
    pub fn new(
        listing_repo: Arc<dyn ListingRepo>,
        cache: Arc<dyn ReadCache>,
        publisher: Arc<dyn EventPublisher>,
        detail_ttl_secs: u64,
        search_ttl_secs: u64,
    ) -> Self {
        Self {
            listing_repo,
            cache,
            publisher,
            detail_ttl_secs,
            search_ttl_secs,
        }
    }

    /// Cache read that treats every failure as a miss: an unreachable cache
    /// falls through to the store instead of failing the request.
    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed; falling through");
                None
            }
        }
    }

    async fn cache_set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache serialize failed");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, ttl_secs).await {
            tracing::warn!(key, error = %e, "cache write failed; proceeding uncached");
        }
    }

    /// Synchronous double invalidation after any mutation: the detail key and
    /// the coarse pattern over every cached search page. Runs before the
    /// mutation returns; failures are logged (staleness then bounded by TTL).
    async fn invalidate_for(&self, id: ListingId) {
        if let Err(e) = self.cache.invalidate(&detail_key(id)).await {
            tracing::warn!(listing_id = %id, error = %e, "detail invalidation failed");
        }
        if let Err(e) = self.cache.invalidate_pattern(SEARCH_PATTERN).await {
            tracing::warn!(listing_id = %id, error = %e, "search invalidation failed");
        }
    }

    fn publish_detached(&self, topic: &'static str, key: String, payload: Vec<u8>) {
        let publisher = self.publisher.clone();
        detach("listing event publish", async move {
            publisher.publish(topic, key.as_bytes(), &payload).await
        });
    }
}

#[async_trait::async_trait]
impl ListingService for RealListingService {
    async fn search(&self, query: SearchQuery) -> Result<SearchPage, ListingError> {
        let key = search_key(&query);
        if let Some(page) = self.cache_get::<SearchPage>(&key).await {
            return Ok(page);
        }

        let page = self.listing_repo.search(&query).await?;
        self.cache_set(&key, &page, self.search_ttl_secs).await;
        Ok(page)
    }

    async fn get(&self, id: ListingId, viewer: Option<UserId>) -> Result<Listing, ListingError> {
        let key = detail_key(id);
        let listing = match self.cache_get::<Listing>(&key).await {
            Some(listing) => listing,
            None => {
                let listing = self
                    .listing_repo
                    .fetch(id)
                    .await?
                    .ok_or(ListingError::NotFound)?;
                self.cache_set(&key, &listing, self.detail_ttl_secs).await;
                listing
            }
        };

        // view counting and the analytics event never hold up the response
        let repo = self.listing_repo.clone();
        detach("view count bump", async move {
            repo.bump_views(id).await.map_err(anyhow::Error::from)
        });

        let event = ListingViewed {
            listing_id: id,
            viewer_id: viewer,
            at: Utc::now(),
        };
        if let Ok(payload) = serde_json::to_vec(&event) {
            self.publish_detached(topics::LISTING_VIEWED, id.to_string(), payload);
        }

        Ok(listing)
    }

    async fn create(
        &self,
        principal: Principal,
        draft: ListingDraft,
    ) -> Result<Listing, ListingError> {
        let listing = self.listing_repo.create(principal.id, &draft).await?;

        self.invalidate_for(listing.id).await;

        let event = ListingCreated {
            listing_id: listing.id,
            city: listing.city.clone(),
            rent: listing.rent,
            at: Utc::now(),
        };
        if let Ok(payload) = serde_json::to_vec(&event) {
            self.publish_detached(topics::LISTING_CREATED, listing.id.to_string(), payload);
        }

        Ok(listing)
    }

    async fn update(
        &self,
        principal: Principal,
        id: ListingId,
        patch: ListingPatch,
    ) -> Result<Listing, ListingError> {
        let existing = self
            .listing_repo
            .fetch(id)
            .await?
            .ok_or(ListingError::NotFound)?;
        if !principal.can_manage(existing.landlord_id) {
            return Err(ListingError::Forbidden);
        }

        let updated = self.listing_repo.update(id, &patch).await?;

        self.invalidate_for(id).await;

        let event = ListingUpdated {
            listing_id: id,
            at: Utc::now(),
        };
        if let Ok(payload) = serde_json::to_vec(&event) {
            self.publish_detached(topics::LISTING_UPDATED, id.to_string(), payload);
        }

        Ok(updated)
    }

    async fn delete(&self, principal: Principal, id: ListingId) -> Result<(), ListingError> {
        let existing = self
            .listing_repo
            .fetch(id)
            .await?
            .ok_or(ListingError::NotFound)?;
        if !principal.can_manage(existing.landlord_id) {
            return Err(ListingError::Forbidden);
        }

        self.listing_repo.delete(id).await?;

        self.invalidate_for(id).await;

        let event = ListingDeleted {
            listing_id: id,
            at: Utc::now(),
        };
        if let Ok(payload) = serde_json::to_vec(&event) {
            self.publish_detached(topics::LISTING_DELETED, id.to_string(), payload);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::{CacheError, ReadCache};
    use crate::infra_memory::{MemoryBus, MemoryListingRepo, MemoryReadCache};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        service: RealListingService,
        repo: Arc<MemoryListingRepo>,
        cache: Arc<MemoryReadCache>,
        bus: Arc<MemoryBus>,
    }

    fn harness() -> Harness {
        let repo = Arc::new(MemoryListingRepo::new());
        let cache = Arc::new(MemoryReadCache::new());
        let bus = Arc::new(MemoryBus::new(CancellationToken::new()));
        let service = RealListingService::new(repo.clone(), cache.clone(), bus.clone(), 300, 120);
        Harness {
            service,
            repo,
            cache,
            bus,
        }
    }

    fn landlord() -> Principal {
        Principal {
            id: UserId(uuid::Uuid::new_v4()),
            role: Role::Landlord,
        }
    }

    fn draft(city: &str, rent: i64) -> ListingDraft {
        ListingDraft {
            title: "Sunny two-bed".to_string(),
            description: None,
            kind: ListingKind::Apartment,
            city: city.to_string(),
            rent,
            bedrooms: Some(2),
            pets_allowed: false,
            is_furnished: false,
        }
    }

    fn any_query() -> SearchQuery {
        SearchQuery {
            city: None,
            kind: None,
            min_rent: None,
            max_rent: None,
            bedrooms: None,
            pets_allowed: None,
            is_furnished: None,
            page: 1,
            limit: 12,
            sort: SearchSort::CreatedAt,
        }
    }

    async fn eventually_published(bus: &MemoryBus, topic: &str, count: usize) -> bool {
        for _ in 0..100 {
            if bus.published_to(topic) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_search_populates_and_reuses_the_cache() {
        let h = harness();
        let owner = landlord();
        h.service.create(owner, draft("Austin", 1000)).await.unwrap();

        let query = any_query();
        let first = h.service.search(query.clone()).await.unwrap();
        assert_eq!(first.total, 1);

        // a second identical query is served from the cache entry
        let key = search_key(&query);
        assert!(h.cache.get(&key).await.unwrap().is_some());
        let second = h.service.search(query).await.unwrap();
        assert_eq!(second.total, 1);
    }

    #[tokio::test]
    async fn test_create_invalidates_every_cached_search_page() {
        let h = harness();
        let owner = landlord();
        h.service.create(owner, draft("Austin", 1000)).await.unwrap();

        let query = any_query();
        h.service.search(query.clone()).await.unwrap();
        let key = search_key(&query);
        assert!(h.cache.get(&key).await.unwrap().is_some());

        h.service.create(owner, draft("Dallas", 800)).await.unwrap();

        // the cached page is gone and the re-run sees the new listing
        assert!(h.cache.get(&key).await.unwrap().is_none());
        let page = h.service.search(query).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_update_invalidates_detail_and_search_keys() {
        let h = harness();
        let owner = landlord();
        let listing = h.service.create(owner, draft("Austin", 1000)).await.unwrap();

        // populate both views
        h.service.get(listing.id, None).await.unwrap();
        h.service.search(any_query()).await.unwrap();
        assert!(
            h.cache
                .get(&detail_key(listing.id))
                .await
                .unwrap()
                .is_some()
        );

        let patch = ListingPatch {
            rent: Some(1100),
            ..Default::default()
        };
        h.service.update(owner, listing.id, patch).await.unwrap();

        assert!(h.cache.get(&detail_key(listing.id)).await.unwrap().is_none());
        assert!(h.cache.get(&search_key(&any_query())).await.unwrap().is_none());

        // staleness bound: a read after the write never sees the old value
        let fresh = h.service.get(listing.id, None).await.unwrap();
        assert_eq!(fresh.rent, 1100);
    }

    #[tokio::test]
    async fn test_unavailable_cache_falls_through_to_the_store() {
        struct DownCache;

        #[async_trait::async_trait]
        impl ReadCache for DownCache {
            async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
                Err(CacheError::Unavailable("connection refused".to_string()))
            }
            async fn set(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), CacheError> {
                Err(CacheError::Unavailable("connection refused".to_string()))
            }
            async fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
                Err(CacheError::Unavailable("connection refused".to_string()))
            }
            async fn invalidate_pattern(&self, _pattern: &str) -> Result<(), CacheError> {
                Err(CacheError::Unavailable("connection refused".to_string()))
            }
        }

        let repo = Arc::new(MemoryListingRepo::new());
        let bus = Arc::new(MemoryBus::new(CancellationToken::new()));
        let service =
            RealListingService::new(repo.clone(), Arc::new(DownCache), bus.clone(), 300, 120);

        let owner = landlord();
        let listing = service.create(owner, draft("Austin", 1000)).await.unwrap();
        let fetched = service.get(listing.id, None).await.unwrap();
        assert_eq!(fetched.id, listing.id);
        let page = service.search(any_query()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_mutations_publish_their_events_best_effort() {
        let h = harness();
        let owner = landlord();
        let listing = h.service.create(owner, draft("Austin", 1000)).await.unwrap();
        assert!(eventually_published(&h.bus, topics::LISTING_CREATED, 1).await);

        h.service
            .update(owner, listing.id, ListingPatch::default())
            .await
            .unwrap();
        assert!(eventually_published(&h.bus, topics::LISTING_UPDATED, 1).await);

        h.service.get(listing.id, None).await.unwrap();
        assert!(eventually_published(&h.bus, topics::LISTING_VIEWED, 1).await);

        h.service.delete(owner, listing.id).await.unwrap();
        assert!(eventually_published(&h.bus, topics::LISTING_DELETED, 1).await);
    }

    #[tokio::test]
    async fn test_view_count_bump_is_detached() {
        let h = harness();
        let owner = landlord();
        let listing = h.service.create(owner, draft("Austin", 1000)).await.unwrap();

        h.service.get(listing.id, None).await.unwrap();

        for _ in 0..100 {
            if h.repo
                .fetch(listing.id)
                .await
                .unwrap()
                .is_some_and(|l| l.views_count == 1)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("views_count never incremented");
    }

    #[tokio::test]
    async fn test_only_the_owner_or_admin_may_mutate() {
        let h = harness();
        let owner = landlord();
        let listing = h.service.create(owner, draft("Austin", 1000)).await.unwrap();

        let stranger = Principal {
            id: UserId(uuid::Uuid::new_v4()),
            role: Role::Tenant,
        };
        let err = h
            .service
            .update(stranger, listing.id, ListingPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::Forbidden));

        let admin = Principal {
            id: UserId(uuid::Uuid::new_v4()),
            role: Role::Admin,
        };
        h.service.delete(admin, listing.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_listing_is_not_found() {
        let h = harness();
        let err = h
            .service
            .get(ListingId(uuid::Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::NotFound));
    }
}

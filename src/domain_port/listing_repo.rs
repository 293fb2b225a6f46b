use crate::application_port::ListingError;
use crate::domain_model::{Listing, ListingDraft, ListingId, ListingPatch, SearchPage, SearchQuery, UserId};

#[async_trait::async_trait]
pub trait ListingRepo: Send + Sync {
    async fn create(
        &self,
        landlord_id: UserId,
        draft: &ListingDraft,
    ) -> Result<Listing, ListingError>;

    async fn fetch(&self, id: ListingId) -> Result<Option<Listing>, ListingError>;

    async fn update(&self, id: ListingId, patch: &ListingPatch)
    -> Result<Listing, ListingError>;

    async fn delete(&self, id: ListingId) -> Result<(), ListingError>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, ListingError>;

    /// Fire-and-forget view counter; failures are the caller's to swallow.
    async fn bump_views(&self, id: ListingId) -> Result<(), ListingError>;
}

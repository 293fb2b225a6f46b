use crate::domain_model::{
    Listing, ListingDraft, ListingId, ListingPatch, Principal, SearchPage, SearchQuery, UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing not found")]
    NotFound,
    #[error("not authorized to manage this listing")]
    Forbidden,
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait ListingService: Send + Sync {
    /// Read-through over the `listings:{fingerprint}` search cache.
    async fn search(&self, query: SearchQuery) -> Result<SearchPage, ListingError>;

    /// Read-through over the `listing:{id}` detail cache. View counting and
    /// the `listing.viewed` publish are detached and best-effort.
    async fn get(&self, id: ListingId, viewer: Option<UserId>) -> Result<Listing, ListingError>;

    async fn create(
        &self,
        principal: Principal,
        draft: ListingDraft,
    ) -> Result<Listing, ListingError>;

    async fn update(
        &self,
        principal: Principal,
        id: ListingId,
        patch: ListingPatch,
    ) -> Result<Listing, ListingError>;

    async fn delete(&self, principal: Principal, id: ListingId) -> Result<(), ListingError>;
}

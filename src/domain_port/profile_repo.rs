use crate::application_port::ProfileError;
use crate::domain_model::{InterestedProfile, ProfileDraft, RoommateProfile, UserId};

#[async_trait::async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn upsert(
        &self,
        user_id: UserId,
        draft: &ProfileDraft,
    ) -> Result<RoommateProfile, ProfileError>;

    async fn fetch(&self, user_id: UserId) -> Result<Option<RoommateProfile>, ProfileError>;

    /// Candidate set for listing fan-out: active profiles whose preferred
    /// city matches `city` case-insensitively and whose `budget_max` covers
    /// `min_budget`. Bounded by `limit`.
    async fn find_interested(
        &self,
        city: &str,
        min_budget: i64,
        limit: u32,
    ) -> Result<Vec<InterestedProfile>, ProfileError>;
}

use crate::domain_model::{ProfileDraft, RoommateProfile, UserId};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait RoommateService: Send + Sync {
    async fn upsert_profile(
        &self,
        user_id: UserId,
        draft: ProfileDraft,
    ) -> Result<RoommateProfile, ProfileError>;

    async fn get_profile(&self, user_id: UserId) -> Result<RoommateProfile, ProfileError>;
}

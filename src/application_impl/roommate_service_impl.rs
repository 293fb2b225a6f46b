use crate::application_port::{ProfileError, RoommateService};
use crate::domain_model::{ProfileDraft, RoommateProfile, UserId};
use crate::domain_port::ProfileRepo;
use std::sync::Arc;

pub struct RealRoommateService {
    profile_repo: Arc<dyn ProfileRepo>,
}

impl RealRoommateService {
    pub fn new(profile_repo: Arc<dyn ProfileRepo>) -> Self {
        Self { profile_repo }
    }
}

#[async_trait::async_trait]
impl RoommateService for RealRoommateService {
    async fn upsert_profile(
        &self,
        user_id: UserId,
        draft: ProfileDraft,
    ) -> Result<RoommateProfile, ProfileError> {
        self.profile_repo.upsert(user_id, &draft).await
    }

    async fn get_profile(&self, user_id: UserId) -> Result<RoommateProfile, ProfileError> {
        self.profile_repo
            .fetch(user_id)
            .await?
            .ok_or(ProfileError::NotFound)
    }
}

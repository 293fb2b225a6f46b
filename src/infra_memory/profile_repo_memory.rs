use crate::application_port::ProfileError;
use crate::domain_model::{InterestedProfile, ProfileDraft, RoommateProfile, UserId};
use crate::domain_port::{ProfileRepo, UserRepo};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Profiles keyed by user; contact details come from the user repo, the
/// in-memory stand-in for the SQL join the real query does.
pub struct MemoryProfileRepo {
    profiles: DashMap<UserId, RoommateProfile>,
    user_repo: Arc<dyn UserRepo>,
}

impl MemoryProfileRepo {
    pub fn new(user_repo: Arc<dyn UserRepo>) -> Self {
        Self {
            profiles: DashMap::new(),
            user_repo,
        }
    }
}

#[async_trait::async_trait]
impl ProfileRepo for MemoryProfileRepo {
    async fn upsert(
        &self,
        user_id: UserId,
        draft: &ProfileDraft,
    ) -> Result<RoommateProfile, ProfileError> {
        let profile = RoommateProfile {
            user_id,
            bio: draft.bio.clone(),
            budget_min: draft.budget_min,
            budget_max: draft.budget_max,
            preferred_city: draft.preferred_city.clone(),
            is_active: draft.is_active,
            updated_at: Utc::now(),
        };
        self.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn fetch(&self, user_id: UserId) -> Result<Option<RoommateProfile>, ProfileError> {
        Ok(self.profiles.get(&user_id).map(|e| e.value().clone()))
    }

    async fn find_interested(
        &self,
        city: &str,
        min_budget: i64,
        limit: u32,
    ) -> Result<Vec<InterestedProfile>, ProfileError> {
        let city_lower = city.to_lowercase();
        let candidates: Vec<UserId> = self
            .profiles
            .iter()
            .filter(|e| {
                let p = e.value();
                p.is_active
                    && p.budget_max.is_some_and(|max| max >= min_budget)
                    && p.preferred_city
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&city_lower))
            })
            .take(limit as usize)
            .map(|e| e.value().user_id)
            .collect();

        let mut interested = Vec::with_capacity(candidates.len());
        for user_id in candidates {
            let record = self
                .user_repo
                .get_by_id(user_id)
                .await
                .map_err(|e| ProfileError::Unavailable(e.to_string()))?;
            if let Some(record) = record {
                interested.push(InterestedProfile {
                    user_id,
                    email: record.email,
                    first_name: record.first_name,
                });
            }
        }

        Ok(interested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::Role;
    use crate::domain_port::{TxManager, UserRecord};
    use crate::infra_memory::{MemoryTxManager, MemoryUserRepo};
    use chrono::Utc;

    async fn seed_seeker(users: &MemoryUserRepo, profiles: &MemoryProfileRepo, n: usize) {
        let user_id = UserId(uuid::Uuid::new_v4());
        let mut tx = MemoryTxManager.begin().await.unwrap();
        users
            .create_in_tx(
                tx.as_mut(),
                &UserRecord {
                    user_id,
                    email: format!("seeker{n}@example.com"),
                    password_hash: "x".to_string(),
                    first_name: "Sam".to_string(),
                    last_name: "Seeker".to_string(),
                    phone: None,
                    role: Role::Tenant,
                    is_active: true,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        profiles
            .upsert(
                user_id,
                &ProfileDraft {
                    bio: None,
                    budget_min: None,
                    budget_max: Some(2000),
                    preferred_city: Some("Austin".to_string()),
                    is_active: true,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_candidate_set_is_capped() {
        let users = Arc::new(MemoryUserRepo::new());
        let profiles = MemoryProfileRepo::new(users.clone());

        for n in 0..60 {
            seed_seeker(&users, &profiles, n).await;
        }

        let interested = profiles.find_interested("Austin", 900, 50).await.unwrap();
        assert_eq!(interested.len(), 50);
    }
}

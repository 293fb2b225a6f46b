use crate::application_port::ProfileError;
use crate::domain_model::{InterestedProfile, ProfileDraft, RoommateProfile, UserId};
use crate::domain_port::ProfileRepo;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlProfileRepo {
    pool: MySqlPool,
}

impl MySqlProfileRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlProfileRepo { pool }
    }

    fn row_to_profile(r: &MySqlRow) -> RoommateProfile {
        RoommateProfile {
            user_id: r.get::<UserId, _>("user_id"),
            bio: r.get("bio"),
            budget_min: r.get("budget_min"),
            budget_max: r.get("budget_max"),
            preferred_city: r.get("preferred_city"),
            is_active: r.get("is_active"),
            updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
        }
    }
}

#[async_trait::async_trait]
impl ProfileRepo for MySqlProfileRepo {
    async fn upsert(
        &self,
        user_id: UserId,
        draft: &ProfileDraft,
    ) -> Result<RoommateProfile, ProfileError> {
        sqlx::query(
            r#"
INSERT INTO roommate_profiles (user_id, bio, budget_min, budget_max, preferred_city, is_active, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    bio = VALUES(bio),
    budget_min = VALUES(budget_min),
    budget_max = VALUES(budget_max),
    preferred_city = VALUES(preferred_city),
    is_active = VALUES(is_active),
    updated_at = VALUES(updated_at)
"#,
        )
        .bind(user_id)
        .bind(&draft.bio)
        .bind(draft.budget_min)
        .bind(draft.budget_max)
        .bind(&draft.preferred_city)
        .bind(draft.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::Unavailable(e.to_string()))?;

        self.fetch(user_id).await?.ok_or_else(|| {
            ProfileError::Internal("profile missing immediately after upsert".to_string())
        })
    }

    async fn fetch(&self, user_id: UserId) -> Result<Option<RoommateProfile>, ProfileError> {
        let row = sqlx::query(
            r#"
SELECT user_id, bio, budget_min, budget_max, preferred_city, is_active, updated_at
FROM roommate_profiles
WHERE user_id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ProfileError::Unavailable(e.to_string()))?;

        Ok(row.map(|r| Self::row_to_profile(&r)))
    }

    async fn find_interested(
        &self,
        city: &str,
        min_budget: i64,
        limit: u32,
    ) -> Result<Vec<InterestedProfile>, ProfileError> {
        let rows = sqlx::query(
            r#"
SELECT rp.user_id, u.email, u.first_name
FROM roommate_profiles rp
JOIN users u ON u.user_id = rp.user_id
WHERE LOWER(rp.preferred_city) LIKE ?
  AND rp.budget_max >= ?
  AND rp.is_active = 1
LIMIT ?
"#,
        )
        .bind(format!("%{}%", city.to_lowercase()))
        .bind(min_budget)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ProfileError::Unavailable(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| InterestedProfile {
                user_id: r.get::<UserId, _>("user_id"),
                email: r.get("email"),
                first_name: r.get("first_name"),
            })
            .collect())
    }
}

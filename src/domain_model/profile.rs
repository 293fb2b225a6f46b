use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A roommate-search profile; the candidate set for listing fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoommateProfile {
    pub user_id: UserId,
    pub bio: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub preferred_city: Option<String>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDraft {
    pub bio: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub preferred_city: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Projection used by the notification worker: enough to address a mail.
#[derive(Debug, Clone)]
pub struct InterestedProfile {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
}

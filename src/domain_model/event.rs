use crate::domain_model::{ListingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kafka topics carried by the partitioned-log transport.
pub mod topics {
    pub const LISTING_CREATED: &str = "listing.created";
    pub const LISTING_UPDATED: &str = "listing.updated";
    pub const LISTING_DELETED: &str = "listing.deleted";
    pub const LISTING_VIEWED: &str = "listing.viewed";
}

/// AMQP wiring for the notification exchange.
pub mod routing {
    pub const EXCHANGE: &str = "notifications";
    pub const EMAIL_WELCOME: &str = "email.welcome";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCreated {
    pub listing_id: ListingId,
    pub city: String,
    pub rent: i64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingUpdated {
    pub listing_id: ListingId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDeleted {
    pub listing_id: ListingId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingViewed {
    pub listing_id: ListingId,
    pub viewer_id: Option<UserId>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeEmail {
    pub to: String,
    pub name: String,
    pub user_id: UserId,
}

use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ListingId(pub uuid::Uuid);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ListingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(ListingId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Apartment,
    House,
    Room,
    Studio,
    Condo,
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListingKind::Apartment => "apartment",
            ListingKind::House => "house",
            ListingKind::Room => "room",
            ListingKind::Studio => "studio",
            ListingKind::Condo => "condo",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ListingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "apartment" => Ok(Self::Apartment),
            "house" => Ok(Self::House),
            "room" => Ok(Self::Room),
            "studio" => Ok(Self::Studio),
            "condo" => Ok(Self::Condo),
            _ => anyhow::bail!("unknown listing kind: {}", s),
        }
    }
}

/// The listing row, doubling as the cached detail-view read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub landlord_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub kind: ListingKind,
    pub city: String,
    pub rent: i64,
    pub bedrooms: Option<i32>,
    pub pets_allowed: bool,
    pub is_furnished: bool,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: Option<String>,
    pub kind: ListingKind,
    pub city: String,
    pub rent: i64,
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default)]
    pub is_furnished: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub rent: Option<i64>,
    pub bedrooms: Option<i32>,
    pub pets_allowed: Option<bool>,
    pub is_furnished: Option<bool>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSort {
    Rent,
    CreatedAt,
    ViewsCount,
}

impl Default for SearchSort {
    fn default() -> Self {
        SearchSort::CreatedAt
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    12
}

/// Normalized search filters. The cache key for a search page is derived from
/// this struct, so two requests with identical filters share an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub city: Option<String>,
    pub kind: Option<ListingKind>,
    pub min_rent: Option<i64>,
    pub max_rent: Option<i64>,
    pub bedrooms: Option<i32>,
    pub pets_allowed: Option<bool>,
    pub is_furnished: Option<bool>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort: SearchSort,
}

impl SearchQuery {
    /// Deterministic fingerprint of the normalized query: sha256 over the
    /// field-ordered JSON serialization, hex-encoded.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<Listing>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl SearchPage {
    pub fn new(items: Vec<Listing>, total: u64, page: u32, limit: u32) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Self {
            items,
            total,
            page,
            limit,
            pages,
        }
    }
}

use crate::application_port::ListingError;
use crate::domain_model::*;
use crate::domain_port::ListingRepo;
use chrono::Utc;
use dashmap::DashMap;

pub struct MemoryListingRepo {
    listings: DashMap<ListingId, Listing>,
}

impl MemoryListingRepo {
    pub fn new() -> Self {
        Self {
            listings: DashMap::new(),
        }
    }

    fn matches(listing: &Listing, query: &SearchQuery) -> bool {
        if let Some(city) = &query.city {
            if !listing.city.to_lowercase().contains(&city.to_lowercase()) {
                return false;
            }
        }
        if let Some(kind) = query.kind {
            if listing.kind != kind {
                return false;
            }
        }
        if let Some(min) = query.min_rent {
            if listing.rent < min {
                return false;
            }
        }
        if let Some(max) = query.max_rent {
            if listing.rent > max {
                return false;
            }
        }
        if let Some(bedrooms) = query.bedrooms {
            if listing.bedrooms != Some(bedrooms) {
                return false;
            }
        }
        if query.pets_allowed == Some(true) && !listing.pets_allowed {
            return false;
        }
        if query.is_furnished == Some(true) && !listing.is_furnished {
            return false;
        }
        true
    }
}

impl Default for MemoryListingRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ListingRepo for MemoryListingRepo {
    async fn create(
        &self,
        landlord_id: UserId,
        draft: &ListingDraft,
    ) -> Result<Listing, ListingError> {
        let now = Utc::now();
        let listing = Listing {
            id: ListingId(uuid::Uuid::new_v4()),
            landlord_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            kind: draft.kind,
            city: draft.city.clone(),
            rent: draft.rent,
            bedrooms: draft.bedrooms,
            pets_allowed: draft.pets_allowed,
            is_furnished: draft.is_furnished,
            views_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn fetch(&self, id: ListingId) -> Result<Option<Listing>, ListingError> {
        Ok(self.listings.get(&id).map(|e| e.value().clone()))
    }

    async fn update(
        &self,
        id: ListingId,
        patch: &ListingPatch,
    ) -> Result<Listing, ListingError> {
        let mut entry = self.listings.get_mut(&id).ok_or(ListingError::NotFound)?;
        let listing = entry.value_mut();
        if let Some(title) = &patch.title {
            listing.title = title.clone();
        }
        if let Some(description) = &patch.description {
            listing.description = Some(description.clone());
        }
        if let Some(city) = &patch.city {
            listing.city = city.clone();
        }
        if let Some(rent) = patch.rent {
            listing.rent = rent;
        }
        if let Some(bedrooms) = patch.bedrooms {
            listing.bedrooms = Some(bedrooms);
        }
        if let Some(pets_allowed) = patch.pets_allowed {
            listing.pets_allowed = pets_allowed;
        }
        if let Some(is_furnished) = patch.is_furnished {
            listing.is_furnished = is_furnished;
        }
        listing.updated_at = Utc::now();
        Ok(listing.clone())
    }

    async fn delete(&self, id: ListingId) -> Result<(), ListingError> {
        self.listings.remove(&id).ok_or(ListingError::NotFound)?;
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, ListingError> {
        let mut matched: Vec<Listing> = self
            .listings
            .iter()
            .filter(|e| Self::matches(e.value(), query))
            .map(|e| e.value().clone())
            .collect();

        match query.sort {
            SearchSort::Rent => matched.sort_by_key(|l| std::cmp::Reverse(l.rent)),
            SearchSort::CreatedAt => matched.sort_by_key(|l| std::cmp::Reverse(l.created_at)),
            SearchSort::ViewsCount => matched.sort_by_key(|l| std::cmp::Reverse(l.views_count)),
        }

        let total = matched.len() as u64;
        let items: Vec<Listing> = matched
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();

        Ok(SearchPage::new(items, total, query.page, query.limit))
    }

    async fn bump_views(&self, id: ListingId) -> Result<(), ListingError> {
        if let Some(mut entry) = self.listings.get_mut(&id) {
            entry.value_mut().views_count += 1;
        }
        Ok(())
    }
}

use crate::application_port::ListingError;
use crate::domain_model::*;
use crate::domain_port::ListingRepo;
use chrono::{DateTime, Utc};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::MySqlRow;
use sqlx::{Database, Decode, Encode, MySql, MySqlPool, QueryBuilder, Row, Type};
use std::str::FromStr;

impl<'r, DB: Database> Decode<'r, DB> for ListingKind
where
    &'r str: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<DB>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for ListingKind
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        self.to_string().encode_by_ref(buf)
    }
}

impl<DB: Database> Type<DB> for ListingKind
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        <String as Type<DB>>::type_info()
    }
}

const LISTING_COLUMNS: &str = "id, landlord_id, title, description, kind, city, rent, bedrooms, \
                               pets_allowed, is_furnished, views_count, created_at, updated_at";

pub struct MySqlListingRepo {
    pool: MySqlPool,
}

impl MySqlListingRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlListingRepo { pool }
    }

    fn row_to_listing(r: &MySqlRow) -> Result<Listing, ListingError> {
        let kind_str = r.get::<&str, _>("kind");
        let kind =
            ListingKind::from_str(kind_str).map_err(|e| ListingError::Internal(e.to_string()))?;
        Ok(Listing {
            id: r.get::<ListingId, _>("id"),
            landlord_id: r.get::<UserId, _>("landlord_id"),
            title: r.get("title"),
            description: r.get("description"),
            kind,
            city: r.get("city"),
            rent: r.get("rent"),
            bedrooms: r.get("bedrooms"),
            pets_allowed: r.get("pets_allowed"),
            is_furnished: r.get("is_furnished"),
            views_count: r.get("views_count"),
            created_at: r.get::<DateTime<Utc>, _>("created_at"),
            updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
        })
    }

    fn push_filters<'a>(qb: &mut QueryBuilder<'a, MySql>, query: &'a SearchQuery) {
        if let Some(city) = &query.city {
            qb.push(" AND LOWER(city) LIKE ")
                .push_bind(format!("%{}%", city.to_lowercase()));
        }
        if let Some(kind) = query.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }
        if let Some(min_rent) = query.min_rent {
            qb.push(" AND rent >= ").push_bind(min_rent);
        }
        if let Some(max_rent) = query.max_rent {
            qb.push(" AND rent <= ").push_bind(max_rent);
        }
        if let Some(bedrooms) = query.bedrooms {
            qb.push(" AND bedrooms = ").push_bind(bedrooms);
        }
        if query.pets_allowed == Some(true) {
            qb.push(" AND pets_allowed = 1");
        }
        if query.is_furnished == Some(true) {
            qb.push(" AND is_furnished = 1");
        }
    }

    // sort columns are an allow-list, never caller input
    fn sort_column(sort: SearchSort) -> &'static str {
        match sort {
            SearchSort::Rent => "rent",
            SearchSort::CreatedAt => "created_at",
            SearchSort::ViewsCount => "views_count",
        }
    }
}

#[async_trait::async_trait]
impl ListingRepo for MySqlListingRepo {
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

        sqlx::query(
            r#"
INSERT INTO listings (id, landlord_id, title, description, kind, city, rent, bedrooms,
                      pets_allowed, is_furnished, views_count, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(listing.id)
        .bind(listing.landlord_id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.kind)
        .bind(&listing.city)
        .bind(listing.rent)
        .bind(listing.bedrooms)
        .bind(listing.pets_allowed)
        .bind(listing.is_furnished)
        .bind(listing.views_count)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ListingError::Unavailable(e.to_string()))?;

        Ok(listing)
    }

    async fn fetch(&self, id: ListingId) -> Result<Option<Listing>, ListingError> {
        let row = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ListingError::Unavailable(e.to_string()))?;

        row.map(|r| Self::row_to_listing(&r)).transpose()
    }

    async fn update(
        &self,
        id: ListingId,
        patch: &ListingPatch,
    ) -> Result<Listing, ListingError> {
        let mut qb = QueryBuilder::<MySql>::new("UPDATE listings SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(title) = &patch.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(city) = &patch.city {
            qb.push(", city = ").push_bind(city);
        }
        if let Some(rent) = patch.rent {
            qb.push(", rent = ").push_bind(rent);
        }
        if let Some(bedrooms) = patch.bedrooms {
            qb.push(", bedrooms = ").push_bind(bedrooms);
        }
        if let Some(pets_allowed) = patch.pets_allowed {
            qb.push(", pets_allowed = ").push_bind(pets_allowed);
        }
        if let Some(is_furnished) = patch.is_furnished {
            qb.push(", is_furnished = ").push_bind(is_furnished);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| ListingError::Unavailable(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(ListingError::NotFound);
        }

        self.fetch(id).await?.ok_or(ListingError::NotFound)
    }

    async fn delete(&self, id: ListingId) -> Result<(), ListingError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ListingError::Unavailable(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(ListingError::NotFound);
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, ListingError> {
        let mut count_qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM listings WHERE 1 = 1");
        Self::push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ListingError::Unavailable(e.to_string()))?;

        let mut qb = QueryBuilder::<MySql>::new(format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE 1 = 1"
        ));
        Self::push_filters(&mut qb, query);
        qb.push(format!(
            " ORDER BY {} DESC LIMIT ",
            Self::sort_column(query.sort)
        ));
        qb.push_bind(query.limit as i64);
        qb.push(" OFFSET ").push_bind(query.offset() as i64);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ListingError::Unavailable(e.to_string()))?;

        let items = rows
            .iter()
            .map(Self::row_to_listing)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchPage::new(
            items,
            total as u64,
            query.page,
            query.limit,
        ))
    }

    async fn bump_views(&self, id: ListingId) -> Result<(), ListingError> {
        sqlx::query("UPDATE listings SET views_count = views_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ListingError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

use crate::bus::{EventHandler, HandleOutcome};
use crate::domain_model::{ListingCreated, ListingViewed, topics};
use crate::domain_port::{NotificationRepo, ProfileRepo};
use crate::worker::Mailer;
use std::sync::Arc;

/// Recipients per listing.created fan-out.
const FANOUT_CAP: u32 = 50;

/// Consumer-group handler for the listing log. `listing.created` fans out to
/// interested roommate profiles; each recipient is claimed through a dedup
/// key before mailing, so redelivery of the same event mails nobody twice.
pub struct ListingEventsHandler {
    profile_repo: Arc<dyn ProfileRepo>,
    notification_repo: Arc<dyn NotificationRepo>,
    mailer: Arc<dyn Mailer>,
}

impl ListingEventsHandler {
    pub fn new(
        profile_repo: Arc<dyn ProfileRepo>,
        notification_repo: Arc<dyn NotificationRepo>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            profile_repo,
            notification_repo,
            mailer,
        }
    }

    async fn on_listing_created(&self, event: ListingCreated) -> anyhow::Result<HandleOutcome> {
        // interested = wants the city, budget covers ~90% of the rent
        let min_budget = event.rent - event.rent / 10;
        let candidates = self
            .profile_repo
            .find_interested(&event.city, min_budget, FANOUT_CAP)
            .await?;

        let title = format!("New listing in {}!", event.city);
        let body = format!(
            "A new place in {} was just posted at ${}/month.",
            event.city, event.rent
        );

        let mut claim_errors = 0u32;
        for candidate in candidates {
            let dedup_key = format!(
                "{}:{}:{}",
                topics::LISTING_CREATED,
                event.listing_id,
                candidate.user_id
            );

            let fresh = match self
                .notification_repo
                .insert_once(candidate.user_id, "listing_match", &title, &body, &dedup_key)
                .await
            {
                Ok(fresh) => fresh,
                Err(e) => {
                    tracing::warn!(user_id = %candidate.user_id, error = %e, "dedup claim failed");
                    claim_errors += 1;
                    continue;
                }
            };
            if !fresh {
                continue;
            }

            // each recipient stands alone; a failed send only loses that mail
            if let Err(e) = self.mailer.send(&candidate.email, &title, &body).await {
                tracing::warn!(to = %candidate.email, error = %format!("{e:#}"), "match mail failed");
            }
        }

        if claim_errors > 0 {
            // redelivery re-runs the loop; claimed recipients are skipped
            return Ok(HandleOutcome::Retry);
        }
        Ok(HandleOutcome::Ack)
    }
}

#[async_trait::async_trait]
impl EventHandler for ListingEventsHandler {
    async fn handle(
        &self,
        topic: &str,
        _key: &[u8],
        payload: &[u8],
    ) -> anyhow::Result<HandleOutcome> {
        match topic {
            topics::LISTING_CREATED => {
                let event: ListingCreated = match serde_json::from_slice(payload) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable listing.created");
                        return Ok(HandleOutcome::Ack);
                    }
                };
                self.on_listing_created(event).await
            }
            topics::LISTING_VIEWED => {
                if let Ok(event) = serde_json::from_slice::<ListingViewed>(payload) {
                    tracing::debug!(listing_id = %event.listing_id, "listing viewed");
                }
                Ok(HandleOutcome::Ack)
            }
            other => {
                tracing::warn!(topic = other, "unexpected topic; ignoring");
                Ok(HandleOutcome::Ack)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::{ListingId, ProfileDraft, Role, UserId};
    use crate::domain_port::{ProfileRepo, TxManager, UserRecord, UserRepo};
    use crate::infra_memory::{
        MemoryNotificationRepo, MemoryProfileRepo, MemoryTxManager, MemoryUserRepo, RecordingMailer,
    };
    use chrono::Utc;

    struct Harness {
        handler: ListingEventsHandler,
        user_repo: Arc<MemoryUserRepo>,
        profile_repo: Arc<MemoryProfileRepo>,
        notification_repo: Arc<MemoryNotificationRepo>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness() -> Harness {
        let user_repo = Arc::new(MemoryUserRepo::new());
        let profile_repo = Arc::new(MemoryProfileRepo::new(user_repo.clone()));
        let notification_repo = Arc::new(MemoryNotificationRepo::new());
        let mailer = Arc::new(RecordingMailer::new());
        let handler = ListingEventsHandler::new(
            profile_repo.clone(),
            notification_repo.clone(),
            mailer.clone(),
        );
        Harness {
            handler,
            user_repo,
            profile_repo,
            notification_repo,
            mailer,
        }
    }

    async fn seeker(h: &Harness, email: &str, city: &str, budget_max: i64) -> UserId {
        let user_id = UserId(uuid::Uuid::new_v4());
        let mut tx = MemoryTxManager.begin().await.unwrap();
        h.user_repo
            .create_in_tx(
                tx.as_mut(),
                &UserRecord {
                    user_id,
                    email: email.to_string(),
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
        h.profile_repo
            .upsert(
                user_id,
                &ProfileDraft {
                    bio: None,
                    budget_min: None,
                    budget_max: Some(budget_max),
                    preferred_city: Some(city.to_string()),
                    is_active: true,
                },
            )
            .await
            .unwrap();
        user_id
    }

    fn created_payload(city: &str, rent: i64) -> (ListingId, Vec<u8>) {
        let listing_id = ListingId(uuid::Uuid::new_v4());
        let payload = serde_json::to_vec(&ListingCreated {
            listing_id,
            city: city.to_string(),
            rent,
            at: Utc::now(),
        })
        .unwrap();
        (listing_id, payload)
    }

    #[tokio::test]
    async fn test_fanout_matches_city_case_insensitively_and_budget() {
        let h = harness();
        // budget gate is rent - 10%: 1000 → 900
        seeker(&h, "match1@example.com", "Austin", 1200).await;
        seeker(&h, "match2@example.com", "austin", 900).await;
        seeker(&h, "poor@example.com", "Austin", 500).await;
        seeker(&h, "elsewhere@example.com", "Portland", 5000).await;

        let (_, payload) = created_payload("Austin", 1000);
        let outcome = h
            .handler
            .handle(topics::LISTING_CREATED, b"k", &payload)
            .await
            .unwrap();

        assert!(matches!(outcome, HandleOutcome::Ack));
        assert_eq!(h.mailer.sent_to("match1@example.com"), 1);
        assert_eq!(h.mailer.sent_to("match2@example.com"), 1);
        assert_eq!(h.mailer.sent_to("poor@example.com"), 0);
        assert_eq!(h.mailer.sent_to("elsewhere@example.com"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_sends_at_most_one_mail_per_recipient() {
        let h = harness();
        let user_id = seeker(&h, "match@example.com", "Austin", 1200).await;

        let (_, payload) = created_payload("Austin", 1000);
        h.handler
            .handle(topics::LISTING_CREATED, b"k", &payload)
            .await
            .unwrap();
        h.handler
            .handle(topics::LISTING_CREATED, b"k", &payload)
            .await
            .unwrap();

        assert_eq!(h.mailer.sent_to("match@example.com"), 1);
        assert_eq!(h.notification_repo.count_for_user(user_id), 1);
    }

    #[tokio::test]
    async fn test_distinct_listings_each_notify() {
        let h = harness();
        seeker(&h, "match@example.com", "Austin", 1200).await;

        let (_, first) = created_payload("Austin", 1000);
        let (_, second) = created_payload("Austin", 950);
        h.handler
            .handle(topics::LISTING_CREATED, b"a", &first)
            .await
            .unwrap();
        h.handler
            .handle(topics::LISTING_CREATED, b"b", &second)
            .await
            .unwrap();

        assert_eq!(h.mailer.sent_to("match@example.com"), 2);
    }

    #[tokio::test]
    async fn test_one_failing_recipient_does_not_block_the_rest() {
        let h = harness();
        seeker(&h, "broken@example.com", "Austin", 1200).await;
        seeker(&h, "fine@example.com", "Austin", 1200).await;
        h.mailer.fail_address("broken@example.com");

        let (_, payload) = created_payload("Austin", 1000);
        let outcome = h
            .handler
            .handle(topics::LISTING_CREATED, b"k", &payload)
            .await
            .unwrap();

        assert!(matches!(outcome, HandleOutcome::Ack));
        assert_eq!(h.mailer.sent_to("fine@example.com"), 1);
        assert_eq!(h.mailer.sent_to("broken@example.com"), 0);
    }

    #[tokio::test]
    async fn test_viewed_events_ack_without_side_effects() {
        let h = harness();
        let payload = serde_json::to_vec(&ListingViewed {
            listing_id: ListingId(uuid::Uuid::new_v4()),
            viewer_id: None,
            at: Utc::now(),
        })
        .unwrap();

        let outcome = h
            .handler
            .handle(topics::LISTING_VIEWED, b"k", &payload)
            .await
            .unwrap();
        assert!(matches!(outcome, HandleOutcome::Ack));
        assert!(h.mailer.sent().is_empty());
    }
}

use crate::bus::{EventHandler, HandleOutcome};
use crate::domain_model::WelcomeEmail;
use crate::domain_port::NotificationRepo;
use crate::worker::Mailer;
use std::sync::Arc;

/// Consumes the `email.welcome` queue. Redeliveries are absorbed by the
/// dedup claim, so a crash between send and ack cannot double-mail a user.
pub struct WelcomeEmailHandler {
    notification_repo: Arc<dyn NotificationRepo>,
    mailer: Arc<dyn Mailer>,
}

impl WelcomeEmailHandler {
    pub fn new(notification_repo: Arc<dyn NotificationRepo>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            notification_repo,
            mailer,
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for WelcomeEmailHandler {
    async fn handle(
        &self,
        _topic: &str,
        _key: &[u8],
        payload: &[u8],
    ) -> anyhow::Result<HandleOutcome> {
        let message: WelcomeEmail = match serde_json::from_slice(payload) {
            Ok(m) => m,
            Err(e) => {
                // poison message; retrying cannot fix it
                tracing::warn!(error = %e, "dropping undecodable welcome message");
                return Ok(HandleOutcome::Ack);
            }
        };

        let dedup_key = format!("welcome:{}", message.user_id);
        let title = "Welcome to Hearth!".to_string();
        let body = format!("Hi {}, your account is ready.", message.name);

        let fresh = self
            .notification_repo
            .insert_once(message.user_id, "welcome", &title, &body, &dedup_key)
            .await?;

        if fresh {
            if let Err(e) = self.mailer.send(&message.to, &title, &body).await {
                tracing::warn!(to = %message.to, error = %format!("{e:#}"), "welcome mail failed");
            }
        }

        Ok(HandleOutcome::Ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::UserId;
    use crate::infra_memory::{MemoryNotificationRepo, RecordingMailer};

    fn payload(user_id: UserId) -> Vec<u8> {
        serde_json::to_vec(&WelcomeEmail {
            to: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            user_id,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_sends_one_mail_and_records_the_notification() {
        let repo = Arc::new(MemoryNotificationRepo::new());
        let mailer = Arc::new(RecordingMailer::new());
        let handler = WelcomeEmailHandler::new(repo.clone(), mailer.clone());
        let user_id = UserId(uuid::Uuid::new_v4());

        let outcome = handler
            .handle("email.welcome", b"k", &payload(user_id))
            .await
            .unwrap();
        assert!(matches!(outcome, HandleOutcome::Ack));
        assert_eq!(mailer.sent_to("ada@example.com"), 1);
        assert_eq!(repo.count_for_user(user_id), 1);
    }

    #[tokio::test]
    async fn test_redelivery_does_not_double_mail() {
        let repo = Arc::new(MemoryNotificationRepo::new());
        let mailer = Arc::new(RecordingMailer::new());
        let handler = WelcomeEmailHandler::new(repo.clone(), mailer.clone());
        let user_id = UserId(uuid::Uuid::new_v4());

        let body = payload(user_id);
        handler.handle("email.welcome", b"k", &body).await.unwrap();
        handler.handle("email.welcome", b"k", &body).await.unwrap();

        assert_eq!(mailer.sent_to("ada@example.com"), 1);
        assert_eq!(repo.count_for_user(user_id), 1);
    }

    #[tokio::test]
    async fn test_poison_payload_is_dropped_not_retried() {
        let repo = Arc::new(MemoryNotificationRepo::new());
        let mailer = Arc::new(RecordingMailer::new());
        let handler = WelcomeEmailHandler::new(repo, mailer.clone());

        let outcome = handler
            .handle("email.welcome", b"k", b"not json")
            .await
            .unwrap();
        assert!(matches!(outcome, HandleOutcome::Ack));
        assert!(mailer.sent().is_empty());
    }
}

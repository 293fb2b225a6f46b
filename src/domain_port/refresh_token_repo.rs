use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

/// Persistence of `refresh_tokens(user_id, token, expires_at)`, keyed by the
/// token's opaque value. At most one live row exists per value; rotation
/// replaces the row atomically within one transaction.
#[async_trait::async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn insert_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// The rotation exclusivity gate: conditional delete of the unexpired
    /// row, reporting whether a row was actually removed. Of two concurrent
    /// rotations over the same value, exactly one sees `true`.
    async fn consume_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError>;

    /// Unconditional delete, for revocation. Deleting an absent row is fine.
    async fn delete(&self, token: &str) -> Result<(), AuthError>;
}

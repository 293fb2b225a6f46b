use crate::application_port::AuthError;
use crate::domain_model::UserId;

/// The Session Record: one entry per principal holding the jti of the
/// currently-valid refresh token. Overwritten at issue and rotation, cleared
/// at revoke. Lifetime mirrors the refresh TTL. Not consulted during
/// rotation; the persisted refresh-token record is the gate.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_session(
        &self,
        user_id: UserId,
        jti: &str,
        ttl_secs: u64,
    ) -> Result<(), AuthError>;

    async fn clear_session(&self, user_id: UserId) -> Result<(), AuthError>;
}

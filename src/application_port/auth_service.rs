use crate::domain_model::{Principal, Role, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, unparseable, or badly-signed token.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Well-formed token past its TTL.
    #[error("token expired")]
    Expired,
    /// Refresh token whose signature verifies but no live persisted record
    /// matches. Covers revoked, rotated-out, and never-issued identically.
    #[error("invalid refresh token")]
    Invalid,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account disabled")]
    AccountDisabled,
    #[error("email already registered")]
    EmailTaken,
    #[error("{0}")]
    Validation(String),
    /// Store/cache/broker unreachable: fatal for the request, not the process.
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: UserProfile,
    pub tokens: AuthTokens,
}

/// Claims extracted from a verified refresh token. `jti` is the opaque value
/// the persisted record is keyed by.
#[derive(Debug, Clone)]
pub struct RefreshClaims {
    pub user_id: UserId,
    pub jti: String,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        principal: Principal,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;

    async fn issue_refresh_token(
        &self,
        user_id: UserId,
        jti: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;

    /// Signature + expiry check only; never touches a store.
    async fn verify_access_token(&self, token: &AccessToken) -> Result<Principal, AuthError>;

    async fn verify_refresh_token(&self, token: &RefreshToken) -> Result<RefreshClaims, AuthError>;

    /// Decode for teardown: signature must verify, expiry is ignored, so a
    /// logout presented after natural expiry still clears server state.
    async fn decode_refresh_for_revoke(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError>;

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;

    /// Stateless check: the embedded principal is trusted as-is. A revoked
    /// session does not invalidate an already-issued access token before its
    /// natural expiry; that exposure window equals the access TTL.
    async fn verify_access(&self, token: &str) -> Result<Principal, AuthError>;

    /// Single-use rotation: consumes the persisted record (conditional
    /// delete), issues a replacement. Replay of a consumed token fails
    /// `Invalid` even while its signature still verifies.
    async fn rotate(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Idempotent teardown: deletes the persisted record and clears the
    /// session record. Revoking an already-revoked token is a success.
    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError>;

    async fn me(&self, principal: Principal) -> Result<UserProfile, AuthError>;
}

use crate::application_port::*;
use crate::bus::{EventPublisher, detach};
use crate::domain_model::{Principal, UserId, WelcomeEmail, routing};
use crate::domain_port::{RefreshTokenRepo, SessionStore, TxManager, UserRepo, UserRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
const MIN_NAME_LEN: usize = 2;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    refresh_repo: Arc<dyn RefreshTokenRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    tx_manager: Arc<dyn TxManager>,
    publisher: Arc<dyn EventPublisher>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        refresh_repo: Arc<dyn RefreshTokenRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        tx_manager: Arc<dyn TxManager>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            user_repo,
            refresh_repo,
            credential_hasher,
            token_codec,
            session_store,
            tx_manager,
            publisher,
        }
    }

    fn validate_register(request: &RegisterInput) -> Result<(), AuthError> {
        if !request.email.contains('@') {
            return Err(AuthError::Validation("invalid email".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation("password too short".to_string()));
        }
        if request.first_name.len() < MIN_NAME_LEN || request.last_name.len() < MIN_NAME_LEN {
            return Err(AuthError::Validation("name too short".to_string()));
        }
        Ok(())
    }

    fn new_jti() -> String {
        Uuid::new_v4().to_string()
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    fn profile(record: &UserRecord) -> UserProfile {
        UserProfile {
            id: record.user_id,
            email: record.email.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            phone: record.phone.clone(),
            role: record.role,
            created_at: record.created_at,
        }
    }

    /// Mint both tokens, persist the refresh record, overwrite the session
    /// record. The session write is detached: once the record is committed it
    /// finishes even if the caller's request future is dropped.
    async fn issue_tokens(&self, principal: Principal) -> Result<AuthTokens, AuthError> {
        let jti = Self::new_jti();

        let (access_token, access_exp) = self.token_codec.issue_access_token(principal).await?;
        let (refresh_token, refresh_exp) = self
            .token_codec
            .issue_refresh_token(principal.id, &jti)
            .await?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        self.refresh_repo
            .insert_in_tx(tx.as_mut(), principal.id, &jti, refresh_exp)
            .await?;
        tx.commit()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        self.put_session_detached(principal.id, jti, refresh_exp)
            .await;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    async fn put_session_detached(&self, user_id: UserId, jti: String, until: DateTime<Utc>) {
        let session_store = self.session_store.clone();
        let ttl = Self::ttl_secs(until);
        let handle = detach("session record write", async move {
            session_store.put_session(user_id, &jti, ttl).await?;
            Ok(())
        });
        // awaiting only observes completion; the task itself is not cancelable
        let _ = handle.await;
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError> {
        Self::validate_register(&request)?;

        if self.user_repo.email_exists(&request.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self
            .credential_hasher
            .hash_password(&request.password)
            .await?;

        let record = UserRecord {
            user_id: UserId(Uuid::new_v4()),
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            role: request.role,
            is_active: true,
            created_at: Utc::now(),
        };

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        self.user_repo.create_in_tx(tx.as_mut(), &record).await?;
        tx.commit()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let principal = Principal {
            id: record.user_id,
            role: record.role,
        };
        let tokens = self.issue_tokens(principal).await?;

        let publisher = self.publisher.clone();
        let welcome = WelcomeEmail {
            to: record.email.clone(),
            name: record.first_name.clone(),
            user_id: record.user_id,
        };
        detach("welcome email publish", async move {
            let payload = serde_json::to_vec(&welcome)?;
            publisher
                .publish(routing::EMAIL_WELCOME, welcome.user_id.to_string().as_bytes(), &payload)
                .await
        });

        Ok(LoginResult {
            user: Self::profile(&record),
            tokens,
        })
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let record = self
            .user_repo
            .get_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !record.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let ok = self
            .credential_hasher
            .verify_password(&request.password, &record.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let principal = Principal {
            id: record.user_id,
            role: record.role,
        };
        let tokens = self.issue_tokens(principal).await?;

        Ok(LoginResult {
            user: Self::profile(&record),
            tokens,
        })
    }

    async fn verify_access(&self, token: &str) -> Result<Principal, AuthError> {
        self.token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await
    }

    async fn rotate(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await?;

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        // Exclusivity gate: of two concurrent rotations over the same value,
        // only one removes the row.
        let consumed = self
            .refresh_repo
            .consume_in_tx(tx.as_mut(), &claims.jti, Utc::now())
            .await?;
        if !consumed {
            tx.rollback()
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string()))?;
            return Err(AuthError::Invalid);
        }

        // Re-read the principal so a role change lands in the new token.
        let Some(principal) = self.user_repo.get_principal(claims.user_id).await? else {
            tx.rollback()
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string()))?;
            return Err(AuthError::Invalid);
        };

        let new_jti = Self::new_jti();
        let (access_token, access_exp) = self.token_codec.issue_access_token(principal).await?;
        let (new_refresh, refresh_exp) = self
            .token_codec
            .issue_refresh_token(principal.id, &new_jti)
            .await?;

        self.refresh_repo
            .insert_in_tx(tx.as_mut(), principal.id, &new_jti, refresh_exp)
            .await?;
        tx.commit()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        self.put_session_detached(principal.id, new_jti, refresh_exp)
            .await;

        Ok(AuthTokens {
            access_token,
            refresh_token: new_refresh,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self
            .token_codec
            .decode_refresh_for_revoke(&RefreshToken(refresh_token.to_string()))
            .await?;

        self.refresh_repo.delete(&claims.jti).await?;

        let session_store = self.session_store.clone();
        let user_id = claims.user_id;
        let handle = detach("session record clear", async move {
            session_store.clear_session(user_id).await?;
            Ok(())
        });
        let _ = handle.await;

        Ok(())
    }

    async fn me(&self, principal: Principal) -> Result<UserProfile, AuthError> {
        let record = self
            .user_repo
            .get_by_id(principal.id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        Ok(Self::profile(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtConfig, JwtHs256Codec};
    use crate::domain_model::Role;
    use crate::infra_memory::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        service: Arc<RealAuthService>,
        codec: Arc<JwtHs256Codec>,
        refresh_repo: Arc<MemoryRefreshTokenRepo>,
        session_store: Arc<MemorySessionStore>,
        user_repo: Arc<MemoryUserRepo>,
        bus: Arc<MemoryBus>,
    }

    fn harness() -> Harness {
        let codec = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "hearth.auth".to_string(),
            audience: "hearth-web".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(604800),
            signing_key: b"test-signing-key".to_vec(),
        }));
        let user_repo = Arc::new(MemoryUserRepo::new());
        let refresh_repo = Arc::new(MemoryRefreshTokenRepo::new());
        let session_store = Arc::new(MemorySessionStore::new());
        let bus = Arc::new(MemoryBus::new(CancellationToken::new()));

        let service = Arc::new(RealAuthService::new(
            user_repo.clone(),
            refresh_repo.clone(),
            Arc::new(Argon2PasswordHasher {}),
            codec.clone(),
            session_store.clone(),
            Arc::new(MemoryTxManager),
            bus.clone(),
        ));

        Harness {
            service,
            codec,
            refresh_repo,
            session_store,
            user_repo,
            bus,
        }
    }

    fn register_input(email: &str, role: Role) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "correct-horse".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: None,
            role,
        }
    }

    async fn registered(h: &Harness, email: &str) -> LoginResult {
        h.service
            .register(register_input(email, Role::Tenant))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_both_tokens_with_spec_ttls() {
        let h = harness();
        registered(&h, "ada@example.com").await;

        let result = h
            .service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "correct-horse".to_string(),
            })
            .await
            .unwrap();

        let access_secs = (result.tokens.access_token_expires_at - Utc::now()).num_seconds();
        let refresh_secs = (result.tokens.refresh_token_expires_at - Utc::now()).num_seconds();
        assert!((898..=900).contains(&access_secs), "access ttl {access_secs}");
        assert!(
            (604_798..=604_800).contains(&refresh_secs),
            "refresh ttl {refresh_secs}"
        );

        // a persisted record exists, keyed by the token's opaque value
        let claims = h
            .codec
            .verify_refresh_token(&result.tokens.refresh_token)
            .await
            .unwrap();
        assert!(h.refresh_repo.contains(&claims.jti));
        assert_eq!(h.session_store.current_jti(result.user.id), Some(claims.jti));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password_and_disabled_account() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;

        let err = h
            .service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        h.user_repo.set_active(result.user.id, false);
        let err = h
            .service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "correct-horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let h = harness();
        registered(&h, "ada@example.com").await;

        let err = h
            .service
            .register(register_input("ada@example.com", Role::Tenant))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_register_publishes_welcome_email_best_effort() {
        let h = harness();
        registered(&h, "ada@example.com").await;

        // the publish is detached; give it a moment
        for _ in 0..100 {
            if h.bus.published_to(routing::EMAIL_WELCOME) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.bus.published_to(routing::EMAIL_WELCOME), 1);
    }

    #[tokio::test]
    async fn test_verify_access_trusts_claims_and_rejects_garbage() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;

        let principal = h
            .service
            .verify_access(&result.tokens.access_token.0)
            .await
            .unwrap();
        assert_eq!(principal.id, result.user.id);
        assert_eq!(principal.role, Role::Tenant);

        let err = h.service.verify_access("not-a-token").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_rotation_is_single_use() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;
        let old = result.tokens.refresh_token.0.clone();

        let rotated = h.service.rotate(&old).await.unwrap();
        assert_ne!(rotated.refresh_token.0, old);

        // the old value's signature still verifies, but its record is gone
        let err = h.service.rotate(&old).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid));

        // the replacement still works
        h.service.rotate(&rotated.refresh_token.0).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_rotation_yields_one_winner() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;
        let token = result.tokens.refresh_token.0;

        let (a, b) = tokio::join!(h.service.rotate(&token), h.service.rotate(&token));

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one rotation may win");
        for r in [a, b] {
            if let Err(e) = r {
                assert!(matches!(e, AuthError::Invalid));
            }
        }
    }

    #[tokio::test]
    async fn test_rotate_with_revoked_record_is_invalid_not_a_crash() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;
        let token = result.tokens.refresh_token.0;

        h.service.revoke(&token).await.unwrap();

        let err = h.service.rotate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_clears_the_session() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;
        let token = result.tokens.refresh_token.0;
        assert!(h.session_store.current_jti(result.user.id).is_some());

        h.service.revoke(&token).await.unwrap();
        assert_eq!(h.session_store.current_jti(result.user.id), None);

        // second revoke: success, nothing further happens
        h.service.revoke(&token).await.unwrap();
        assert_eq!(h.session_store.current_jti(result.user.id), None);
    }

    #[tokio::test]
    async fn test_revoke_rejects_forged_tokens_before_any_side_effect() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;
        let mut forged = result.tokens.refresh_token.0.clone();
        forged.push('x');

        let err = h.service.revoke(&forged).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
        // the genuine session is untouched
        assert!(h.session_store.current_jti(result.user.id).is_some());
    }

    #[tokio::test]
    async fn test_rotation_reissues_role_from_the_user_row() {
        let h = harness();
        let result = h
            .service
            .register(register_input("lord@example.com", Role::Landlord))
            .await
            .unwrap();

        let rotated = h.service.rotate(&result.tokens.refresh_token.0).await.unwrap();
        let principal = h
            .service
            .verify_access(&rotated.access_token.0)
            .await
            .unwrap();
        assert_eq!(principal.role, Role::Landlord);
    }

    #[tokio::test]
    async fn test_rotation_for_deactivated_user_is_invalid() {
        let h = harness();
        let result = registered(&h, "ada@example.com").await;
        h.user_repo.set_active(result.user.id, false);

        let err = h
            .service
            .rotate(&result.tokens.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid));
    }
}

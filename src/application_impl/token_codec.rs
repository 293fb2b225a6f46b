use crate::application_port::{AccessToken, AuthError, RefreshClaims, RefreshToken, TokenCodec};
use crate::domain_model::{Principal, Role, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    role: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshTokenClaims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // the opaque value the persisted record is keyed by
}

fn encode_access(
    principal: Principal,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: principal.id.to_string(),
        role: principal.role.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok((token, exp_dt))
}

fn encode_refresh(
    uid: UserId,
    jti: &str,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.refresh_ttl;
    let claims = RefreshTokenClaims {
        sub: uid.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti: jti.to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok((token, exp_dt))
}

fn validation(cfg: &JwtConfig, validate_exp: bool) -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = validate_exp;
    v.leeway = 0;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    v
}

fn decode_access(token: &str, cfg: &JwtConfig) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(&cfg.signing_key),
        &validation(cfg, true),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Unauthenticated,
    })?;
    Ok(data.claims)
}

fn decode_refresh(
    token: &str,
    cfg: &JwtConfig,
    validate_exp: bool,
) -> Result<RefreshTokenClaims, AuthError> {
    let data = decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(&cfg.signing_key),
        &validation(cfg, validate_exp),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Unauthenticated,
    })?;
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::Unauthenticated)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        principal: Principal,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(principal, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        user_id: UserId,
        jti: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_refresh(user_id, jti, &self.cfg)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(&self, token: &AccessToken) -> Result<Principal, AuthError> {
        let claims = decode_access(&token.0, &self.cfg)?;
        let id = Self::parse_user_id(&claims.sub)?;
        let role = Role::from_str(&claims.role).map_err(|_| AuthError::Unauthenticated)?;
        Ok(Principal { id, role })
    }

    async fn verify_refresh_token(&self, token: &RefreshToken) -> Result<RefreshClaims, AuthError> {
        let claims = decode_refresh(&token.0, &self.cfg, true)?;
        let user_id = Self::parse_user_id(&claims.sub)?;
        Ok(RefreshClaims {
            user_id,
            jti: claims.jti,
        })
    }

    async fn decode_refresh_for_revoke(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshClaims, AuthError> {
        let claims = decode_refresh(&token.0, &self.cfg, false)?;
        let user_id = Self::parse_user_id(&claims.sub)?;
        Ok(RefreshClaims {
            user_id,
            jti: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg() -> JwtConfig {
        JwtConfig {
            issuer: "hearth.auth".to_string(),
            audience: "hearth-web".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(604800),
            signing_key: b"test-signing-key".to_vec(),
        }
    }

    fn principal() -> Principal {
        Principal {
            id: UserId(uuid::Uuid::new_v4()),
            role: Role::Landlord,
        }
    }

    #[tokio::test]
    async fn test_access_token_roundtrip_preserves_principal() {
        let codec = JwtHs256Codec::new(test_cfg());
        let p = principal();

        let (token, exp) = codec.issue_access_token(p).await.unwrap();
        assert!(exp > Utc::now());

        let verified = codec.verify_access_token(&token).await.unwrap();
        assert_eq!(verified.id, p.id);
        assert_eq!(verified.role, p.role);
    }

    #[tokio::test]
    async fn test_tampered_token_is_unauthenticated() {
        let codec = JwtHs256Codec::new(test_cfg());
        let (token, _) = codec.issue_access_token(principal()).await.unwrap();

        let mut forged = token.0.clone();
        forged.push('x');
        let err = codec
            .verify_access_token(&AccessToken(forged))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_wrong_key_is_unauthenticated() {
        let codec = JwtHs256Codec::new(test_cfg());
        let mut other_cfg = test_cfg();
        other_cfg.signing_key = b"another-key".to_vec();
        let other = JwtHs256Codec::new(other_cfg);

        let (token, _) = other.issue_access_token(principal()).await.unwrap();
        let err = codec.verify_access_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_refresh_claims_carry_the_persisted_jti() {
        let codec = JwtHs256Codec::new(test_cfg());
        let uid = UserId(uuid::Uuid::new_v4());

        let (token, _) = codec.issue_refresh_token(uid, "opaque-jti").await.unwrap();
        let claims = codec.verify_refresh_token(&token).await.unwrap();
        assert_eq!(claims.user_id, uid);
        assert_eq!(claims.jti, "opaque-jti");
    }

    #[tokio::test]
    async fn test_revoke_decode_ignores_expiry() {
        let mut cfg = test_cfg();
        cfg.refresh_ttl = Duration::from_secs(0);
        let codec = JwtHs256Codec::new(cfg);
        let uid = UserId(uuid::Uuid::new_v4());

        let (token, _) = codec.issue_refresh_token(uid, "stale").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // the normal path rejects it...
        assert!(codec.verify_refresh_token(&token).await.is_err());
        // ...the teardown path still yields the claims
        let claims = codec.decode_refresh_for_revoke(&token).await.unwrap();
        assert_eq!(claims.jti, "stale");
    }
}

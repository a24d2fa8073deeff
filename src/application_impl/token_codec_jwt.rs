use crate::application_port::*;
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Two signing domains: a leaked access secret cannot mint refresh tokens
/// and the other way round.
#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub exp: i64,
    pub jti: String, // per-token nonce, keeps same-second tokens distinct
}

/// Signs `{user_id, exp: now + ttl}` with HS256.
pub fn issue_token(
    user_id: UserId,
    secret: &[u8],
    ttl: chrono::Duration,
) -> Result<(String, DateTime<Utc>), TokenError> {
    let exp_dt = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::Signing(format!("expiry out of range: {}", ttl)))?;
    let claims = Claims {
        user_id: user_id.0,
        exp: exp_dt.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))?;
    Ok((token, exp_dt))
}

/// Verifies signature and expiry. No clock leeway is granted.
pub fn validate_token(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = 0;
    v.set_required_spec_claims(&["exp"]);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &v).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
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

    fn domain(&self, kind: TokenKind) -> (&[u8], chrono::Duration) {
        match kind {
            TokenKind::Access => (self.cfg.access_secret.as_slice(), self.cfg.access_ttl),
            TokenKind::Refresh => (self.cfg.refresh_secret.as_slice(), self.cfg.refresh_ttl),
        }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue(&self, kind: TokenKind, user_id: UserId) -> Result<IssuedToken, TokenError> {
        let (secret, ttl) = self.domain(kind);
        let (token, expires_at) = issue_token(user_id, secret, ttl)?;
        Ok(IssuedToken {
            token,
            expires_at,
            ttl: ttl.to_std().unwrap_or(Duration::ZERO),
        })
    }

    async fn validate(&self, kind: TokenKind, token: &str) -> Result<TokenClaimsView, TokenError> {
        let (secret, _) = self.domain(kind);
        let claims = validate_token(token, secret)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;
        Ok(TokenClaimsView {
            user_id: UserId(claims.user_id),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> JwtConfig {
        JwtConfig {
            access_secret: b"access-secret".to_vec(),
            refresh_secret: b"refresh-secret".to_vec(),
            access_ttl: chrono::Duration::minutes(15),
            refresh_ttl: chrono::Duration::hours(72),
        }
    }

    #[tokio::test]
    async fn issued_tokens_validate_in_their_own_domain() {
        let codec = JwtHs256Codec::new(cfg());
        let access = codec.issue(TokenKind::Access, UserId(42)).await.unwrap();
        let refresh = codec.issue(TokenKind::Refresh, UserId(42)).await.unwrap();

        assert_eq!(
            codec.validate(TokenKind::Access, &access.token).await.unwrap().user_id,
            UserId(42)
        );
        assert_eq!(
            codec.validate(TokenKind::Refresh, &refresh.token).await.unwrap().user_id,
            UserId(42)
        );
        assert_eq!(refresh.ttl, Duration::from_secs(72 * 3600));
    }

    #[tokio::test]
    async fn cross_domain_tokens_fail_signature_check() {
        let codec = JwtHs256Codec::new(cfg());
        let access = codec.issue(TokenKind::Access, UserId(1)).await.unwrap();
        let refresh = codec.issue(TokenKind::Refresh, UserId(1)).await.unwrap();

        assert_eq!(
            codec.validate(TokenKind::Refresh, &access.token).await.unwrap_err(),
            TokenError::InvalidSignature
        );
        assert_eq!(
            codec.validate(TokenKind::Access, &refresh.token).await.unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn expired_and_malformed_tokens() {
        let (token, _) = issue_token(UserId(1), b"s", chrono::Duration::seconds(-5)).unwrap();
        assert_eq!(validate_token(&token, b"s").unwrap_err(), TokenError::Expired);
        assert_eq!(validate_token("not.a.jwt", b"s").unwrap_err(), TokenError::Malformed);
        assert_eq!(validate_token("", b"s").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn missing_user_id_claim_is_malformed() {
        #[derive(Serialize)]
        struct NoUser {
            exp: i64,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoUser {
                exp: (Utc::now() + chrono::Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(b"s"),
        )
        .unwrap();
        assert_eq!(validate_token(&token, b"s").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        assert!(matches!(
            issue_token(UserId(1), b"s", chrono::TimeDelta::MAX),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn tokens_are_unique_per_call() {
        let (a, _) = issue_token(UserId(1), b"s", chrono::Duration::minutes(1)).unwrap();
        let (b, _) = issue_token(UserId(1), b"s", chrono::Duration::minutes(1)).unwrap();
        assert_ne!(a, b);
    }
}

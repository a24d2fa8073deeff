use crate::domain_model::{User, UserId};
use crate::domain_port::{RepoError, SessionStoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid access token")]
    InvalidAccessToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("refresh token not found or expired")]
    RefreshTokenNotFoundOrExpired,
    #[error("user not found")]
    UserNotFound,
    #[error("store error: {0}")]
    Storage(String),
    #[error("token issuance error: {0}")]
    TokenIssuance(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Why a token failed verification. Callers outside the codec treat all of
/// these as "unauthorized".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct TokenClaimsView {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub tokens: AuthTokens,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue(&self, kind: TokenKind, user_id: UserId) -> Result<IssuedToken, TokenError>;
    async fn validate(&self, kind: TokenKind, token: &str) -> Result<TokenClaimsView, TokenError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
    async fn verify_access_token(&self, token: &str) -> Result<UserId, AuthError>;
    async fn get_auth_user(&self, user_id: UserId) -> Result<User, AuthError>;
    async fn track_user_login(&self, user_id: UserId) -> Result<(), AuthError>;
    async fn track_user_logout(&self, user_id: UserId) -> Result<(), AuthError>;
    async fn is_user_online(&self, user_id: UserId) -> Result<bool, AuthError>;
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::Store(e) => AuthError::Storage(e),
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;

const ONLINE: &str = "online";

#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Lifetime of the presence marker, unrelated to any token lifetime.
    pub presence_ttl: Duration,
    /// Replace the refresh token on every refresh instead of reusing it.
    pub rotate_refresh_tokens: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        AuthPolicy {
            presence_ttl: Duration::from_secs(15 * 60),
            rotate_refresh_tokens: false,
        }
    }
}

pub fn refresh_key(refresh_token: &str) -> String {
    format!("refresh:{}", refresh_token)
}

pub fn presence_key(user_id: UserId) -> String {
    format!("user:{}:online", user_id)
}

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    policy: AuthPolicy,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            session_store,
            policy,
        }
    }

    async fn issue(&self, kind: TokenKind, user_id: UserId) -> Result<IssuedToken, AuthError> {
        self.token_codec
            .issue(kind, user_id)
            .await
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }

    /// Issues a refresh token and registers it; an unregistered token could
    /// never be revoked, so a failed write fails the whole call.
    async fn issue_registered_refresh(&self, user_id: UserId) -> Result<IssuedToken, AuthError> {
        let refresh = self.issue(TokenKind::Refresh, user_id).await?;
        self.session_store
            .set(&refresh_key(&refresh.token), &user_id.to_string(), refresh.ttl)
            .await?;
        Ok(refresh)
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;

        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let access = self.issue(TokenKind::Access, user.id).await?;
        let refresh = self.issue_registered_refresh(user.id).await?;

        info!(user_id = %user.id, "user logged in");

        Ok(LoginResult {
            user,
            tokens: AuthTokens {
                access_token: AccessToken(access.token),
                refresh_token: RefreshToken(refresh.token),
                access_token_expires_at: access.expires_at,
            },
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        // Signature and expiry first: an expired token is rejected even while
        // its store entry is still alive.
        let claims = self
            .token_codec
            .validate(TokenKind::Refresh, refresh_token)
            .await
            .map_err(|e| {
                debug!("refresh token rejected: {}", e);
                AuthError::InvalidRefreshToken
            })?;
        let user_id = claims.user_id;

        let key = refresh_key(refresh_token);
        let owner = self
            .session_store
            .get(&key)
            .await?
            .ok_or(AuthError::RefreshTokenNotFoundOrExpired)?;
        if owner.parse::<UserId>().ok() != Some(user_id) {
            warn!(user_id = %user_id, "refresh token registered to a different user");
            return Err(AuthError::InvalidRefreshToken);
        }

        let access = self.issue(TokenKind::Access, user_id).await?;

        let refresh_token = if self.policy.rotate_refresh_tokens {
            let next = self.issue_registered_refresh(user_id).await?;
            self.session_store.delete(&key).await?;
            next.token
        } else {
            refresh_token.to_string()
        };

        Ok(AuthTokens {
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh_token),
            access_token_expires_at: access.expires_at,
        })
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.session_store.delete(&refresh_key(refresh_token)).await?;
        Ok(())
    }

    async fn verify_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = self
            .token_codec
            .validate(TokenKind::Access, token)
            .await
            .map_err(|_| AuthError::InvalidAccessToken)?;
        Ok(claims.user_id)
    }

    async fn get_auth_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn track_user_login(&self, user_id: UserId) -> Result<(), AuthError> {
        self.session_store
            .set(&presence_key(user_id), ONLINE, self.policy.presence_ttl)
            .await?;
        Ok(())
    }

    async fn track_user_logout(&self, user_id: UserId) -> Result<(), AuthError> {
        self.session_store.delete(&presence_key(user_id)).await?;
        Ok(())
    }

    async fn is_user_online(&self, user_id: UserId) -> Result<bool, AuthError> {
        let val = self.session_store.get(&presence_key(user_id)).await?;
        Ok(val.as_deref() == Some(ONLINE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, JwtConfig, JwtHs256Codec, issue_token};
    use crate::infra_memory::*;

    const EMAIL: &str = "a@x.com";
    const PASSWORD: &str = "secret123";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            access_secret: b"access-secret-example".to_vec(),
            refresh_secret: b"refresh-secret-example".to_vec(),
            access_ttl: chrono::Duration::minutes(15),
            refresh_ttl: chrono::Duration::hours(72),
        }
    }

    struct Fixture {
        service: RealAuthService,
        store: Arc<InMemorySessionStore>,
    }

    async fn fixture_with(store: Arc<dyn SessionStore>, policy: AuthPolicy) -> RealAuthService {
        let user_repo = Arc::new(InMemoryUserRepo::with_first_id(
            Arc::new(InMemoryRoleRepo::new()),
            42,
        ));
        let hash = Argon2PasswordHasher.hash_password(PASSWORD).await.unwrap();
        user_repo
            .create(NewUser {
                name: "A".to_string(),
                email: EMAIL.to_string(),
                password_hash: hash,
            })
            .await
            .unwrap();

        RealAuthService::new(
            user_repo,
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(jwt_config())),
            store,
            policy,
        )
    }

    async fn fixture(policy: AuthPolicy) -> Fixture {
        let store = Arc::new(InMemorySessionStore::new());
        let service = fixture_with(store.clone(), policy).await;
        Fixture { service, store }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    /// Every call fails as if Redis were unreachable.
    struct BrokenStore;

    #[async_trait::async_trait]
    impl SessionStore for BrokenStore {
        async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Store("connection refused".to_string()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, SessionStoreError> {
            Err(SessionStoreError::Store("connection refused".to_string()))
        }
        async fn delete(&self, _: &str) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Store("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn login_registers_refresh_token_for_user() {
        let f = fixture(AuthPolicy::default()).await;
        let result = f.service.login(login_input(EMAIL, PASSWORD)).await.unwrap();

        assert_eq!(result.user.id, UserId(42));
        assert!(!result.tokens.access_token.0.is_empty());
        assert!(!result.tokens.refresh_token.0.is_empty());
        let owner = f
            .store
            .get(&refresh_key(&result.tokens.refresh_token.0))
            .await
            .unwrap();
        assert_eq!(owner.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn bad_password_and_unknown_email_look_the_same() {
        let f = fixture(AuthPolicy::default()).await;

        let wrong = f.service.login(login_input(EMAIL, "nope")).await;
        let missing = f.service.login(login_input("b@x.com", PASSWORD)).await;

        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(missing, Err(AuthError::InvalidCredentials)));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_invalid_credentials() {
        let user_repo = Arc::new(InMemoryUserRepo::new(Arc::new(InMemoryRoleRepo::new())));
        user_repo
            .create(NewUser {
                name: "B".to_string(),
                email: "b@x.com".to_string(),
                password_hash: "$2y$10$not-argon".to_string(),
            })
            .await
            .unwrap();
        let store = Arc::new(InMemorySessionStore::new());
        let service = RealAuthService::new(
            user_repo,
            Arc::new(Argon2PasswordHasher),
            Arc::new(JwtHs256Codec::new(jwt_config())),
            store.clone(),
            AuthPolicy::default(),
        );

        assert!(matches!(
            service.login(login_input("b@x.com", PASSWORD)).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn login_fails_when_refresh_token_cannot_be_stored() {
        let service = fixture_with(Arc::new(BrokenStore), AuthPolicy::default()).await;
        let result = service.login(login_input(EMAIL, PASSWORD)).await;
        assert!(matches!(result, Err(AuthError::Storage(_))));
    }

    #[tokio::test]
    async fn refresh_returns_new_access_and_same_refresh() {
        let f = fixture(AuthPolicy::default()).await;
        let login = f.service.login(login_input(EMAIL, PASSWORD)).await.unwrap();

        let refreshed = f
            .service
            .refresh_token(&login.tokens.refresh_token.0)
            .await
            .unwrap();

        assert!(!refreshed.access_token.0.is_empty());
        assert_ne!(refreshed.access_token, login.tokens.access_token);
        assert_eq!(refreshed.refresh_token, login.tokens.refresh_token);
        assert_eq!(
            f.service
                .verify_access_token(&refreshed.access_token.0)
                .await
                .unwrap(),
            UserId(42)
        );

        // Reusable until revoked.
        f.service
            .refresh_token(&login.tokens.refresh_token.0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn logout_revokes_and_is_idempotent() {
        let f = fixture(AuthPolicy::default()).await;
        let login = f.service.login(login_input(EMAIL, PASSWORD)).await.unwrap();
        let token = login.tokens.refresh_token.0;

        f.service.logout(&token).await.unwrap();
        f.service.logout(&token).await.unwrap();

        assert!(matches!(
            f.service.refresh_token(&token).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
    }

    #[tokio::test]
    async fn expired_refresh_token_is_invalid_even_if_stored() {
        let f = fixture(AuthPolicy::default()).await;
        let cfg = jwt_config();
        let (token, _) =
            issue_token(UserId(42), &cfg.refresh_secret, chrono::Duration::seconds(-10)).unwrap();
        f.store
            .set(&refresh_key(&token), "42", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(matches!(
            f.service.refresh_token(&token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let f = fixture(AuthPolicy::default()).await;
        let login = f.service.login(login_input(EMAIL, PASSWORD)).await.unwrap();

        assert!(matches!(
            f.service.refresh_token(&login.tokens.access_token.0).await,
            Err(AuthError::InvalidRefreshToken)
        ));
        assert!(matches!(
            f.service
                .verify_access_token(&login.tokens.refresh_token.0)
                .await,
            Err(AuthError::InvalidAccessToken)
        ));
        assert!(matches!(
            f.service.refresh_token("garbage").await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn store_outage_during_refresh_is_a_storage_error() {
        let service = fixture_with(Arc::new(BrokenStore), AuthPolicy::default()).await;
        let cfg = jwt_config();
        let (token, _) =
            issue_token(UserId(42), &cfg.refresh_secret, chrono::Duration::minutes(5)).unwrap();

        assert!(matches!(
            service.refresh_token(&token).await,
            Err(AuthError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_logins_yield_independent_sessions() {
        let f = fixture(AuthPolicy::default()).await;
        let (a, b) = tokio::join!(
            f.service.login(login_input(EMAIL, PASSWORD)),
            f.service.login(login_input(EMAIL, PASSWORD)),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.tokens.refresh_token, b.tokens.refresh_token);

        f.service.logout(&a.tokens.refresh_token.0).await.unwrap();
        f.service
            .refresh_token(&b.tokens.refresh_token.0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rotation_policy_replaces_refresh_token() {
        let f = fixture(AuthPolicy {
            rotate_refresh_tokens: true,
            ..AuthPolicy::default()
        })
        .await;
        let login = f.service.login(login_input(EMAIL, PASSWORD)).await.unwrap();
        let old = login.tokens.refresh_token.0;

        let refreshed = f.service.refresh_token(&old).await.unwrap();
        assert_ne!(refreshed.refresh_token.0, old);

        assert!(matches!(
            f.service.refresh_token(&old).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
        f.service
            .refresh_token(&refreshed.refresh_token.0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn presence_tracking() {
        let f = fixture(AuthPolicy::default()).await;
        let user = UserId(42);

        assert!(!f.service.is_user_online(user).await.unwrap());
        f.service.track_user_login(user).await.unwrap();
        assert!(f.service.is_user_online(user).await.unwrap());
        assert!(!f.service.is_user_online(UserId(43)).await.unwrap());

        f.service.track_user_logout(user).await.unwrap();
        assert!(!f.service.is_user_online(user).await.unwrap());
        f.service.track_user_logout(user).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn presence_expires_independently_of_tokens() {
        let f = fixture(AuthPolicy {
            presence_ttl: Duration::from_secs(60),
            ..AuthPolicy::default()
        })
        .await;
        let login = f.service.login(login_input(EMAIL, PASSWORD)).await.unwrap();
        f.service.track_user_login(login.user.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!f.service.is_user_online(login.user.id).await.unwrap());
        f.service
            .refresh_token(&login.tokens.refresh_token.0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn auth_user_lookup() {
        let f = fixture(AuthPolicy::default()).await;
        assert_eq!(
            f.service.get_auth_user(UserId(42)).await.unwrap().email,
            EMAIL
        );
        assert!(matches!(
            f.service.get_auth_user(UserId(7)).await,
            Err(AuthError::UserNotFound)
        ));
    }
}

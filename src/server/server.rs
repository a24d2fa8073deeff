use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::i18n::Translator;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::infra_smtp::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{Context, anyhow};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub role_service: Arc<dyn RoleService>,
    pub password_reset_service: Arc<dyn PasswordResetService>,
    pub translator: Arc<Translator>,
    pool: Option<MySqlPool>,
}

struct Stores {
    user_repo: Arc<dyn UserRepo>,
    role_repo: Arc<dyn RoleRepo>,
    session_store: Arc<dyn SessionStore>,
    pool: Option<MySqlPool>,
}

impl Stores {
    fn in_memory() -> Self {
        let roles = Arc::new(InMemoryRoleRepo::new());
        Stores {
            user_repo: Arc::new(InMemoryUserRepo::new(roles.clone())),
            role_repo: roles,
            session_store: Arc::new(InMemorySessionStore::new()),
            pool: None,
        }
    }

    async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let mysql_cfg = settings
            .mysql
            .as_ref()
            .ok_or_else(|| anyhow!("[mysql] section is required for the real store"))?;
        let redis_cfg = settings
            .redis
            .as_ref()
            .ok_or_else(|| anyhow!("[redis] section is required for the real store"))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(mysql_cfg.max_connections)
            .connect(&mysql_cfg.dsn)
            .await
            .context("connecting to mysql")?;

        let redis_client = redis::Client::open(redis_cfg.dsn.as_str())?;
        let redis_manager = redis_client
            .get_connection_manager()
            .await
            .context("connecting to redis")?;

        Ok(Stores {
            user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
            role_repo: Arc::new(MySqlRoleRepo::new(pool.clone())),
            session_store: Arc::new(RedisSessionStore::new(
                redis_manager,
                redis_cfg.prefix.clone(),
            )),
            pool: Some(pool),
        })
    }
}

fn secret(name: &str, value: &str) -> anyhow::Result<Vec<u8>> {
    if value.is_empty() {
        return Err(anyhow!("{} must be set", name));
    }
    Ok(value.as_bytes().to_vec())
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match settings.email.backend.as_str() {
            "fake" => Arc::new(InMemoryMailer::new()),
            "real" => Arc::new(SmtpMailer::new(&SmtpConfig {
                host: settings.email.host.clone(),
                port: settings.email.port,
                username: settings.email.username.clone(),
                password: settings.email.password.clone(),
                sender: settings.email.sender.clone(),
            })?),
            other => return Err(anyhow!("Unknown email backend: {}", other)),
        };
        Self::try_with_mailer(settings, mailer).await
    }

    /// Same as `try_new` with a caller-supplied mailer.
    pub async fn try_with_mailer(
        settings: &Settings,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let auth = &settings.auth;
        let access_secret = secret("auth.access_secret", &auth.access_secret)?;
        let refresh_secret = secret("auth.refresh_secret", &auth.refresh_secret)?;
        if access_secret == refresh_secret {
            warn!("access and refresh tokens share a signing secret");
        }
        let reset_secret = secret(
            "password_reset.token_secret",
            &settings.password_reset.token_secret,
        )?;
        let access_ttl = auth.access_ttl()?;
        let refresh_ttl = auth.refresh_ttl()?;
        let presence_ttl = auth.presence_ttl()?;
        let reset_ttl = settings.password_reset.token_ttl()?;

        let stores = match settings.store.backend.as_str() {
            "fake" => Stores::in_memory(),
            "real" => Stores::connect(settings).await?,
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let translator = Arc::new(Translator::load_embedded()?);
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        }));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            stores.user_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            stores.session_store,
            AuthPolicy {
                presence_ttl,
                rotate_refresh_tokens: auth.rotate_refresh_tokens,
            },
        ));

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            stores.user_repo.clone(),
            credential_hasher.clone(),
        ));

        let role_service: Arc<dyn RoleService> = Arc::new(RealRoleService::new(stores.role_repo));

        let password_reset_service: Arc<dyn PasswordResetService> =
            Arc::new(RealPasswordResetService::new(
                stores.user_repo,
                credential_hasher,
                mailer,
                translator.clone(),
                PasswordResetConfig {
                    token_ttl: reset_ttl,
                    link_base: settings.password_reset.link_base.clone(),
                    token_secret: reset_secret,
                },
            ));

        info!(store = %settings.store.backend, email = %settings.email.backend, "server started");

        Ok(Self {
            auth_service,
            user_service,
            role_service,
            password_reset_service,
            translator,
            pool: stores.pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn settings(auth_extra: &str) -> Settings {
        let toml = format!(
            r#"
            [http]
            address = "127.0.0.1:0"

            [log]
            filter = "info"

            [auth]
            access_secret = "a"
            refresh_secret = "r"
            {}

            [password_reset]
            link_base = "https://example.com/reset_password"
            token_secret = "t"

            [store]
            backend = "fake"

            [email]
            backend = "fake"
            "#,
            auth_extra
        );
        Config::builder()
            .add_source(File::from_str(&toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    async fn build(auth_extra: &str) -> anyhow::Result<Server> {
        Server::try_with_mailer(&settings(auth_extra), Arc::new(InMemoryMailer::new())).await
    }

    #[tokio::test]
    async fn starts_with_default_lifetimes() {
        assert!(build("").await.is_ok());
    }

    #[tokio::test]
    async fn refuses_a_dead_refresh_lifetime() {
        let err = build("refresh_token_expire_hours = 0").await.err().unwrap();
        assert!(err.to_string().contains("refresh_token_expire_hours"));
    }

    #[tokio::test]
    async fn refuses_unusable_lifetimes() {
        assert!(build("access_token_expire_minutes = -1").await.is_err());
        assert!(build("presence_ttl_minutes = 0").await.is_err());
        assert!(
            build(&format!("access_token_expire_minutes = {}", i64::MAX))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn refuses_an_empty_secret() {
        let mut settings = settings("");
        settings.auth.refresh_secret.clear();
        let result = Server::try_with_mailer(&settings, Arc::new(InMemoryMailer::new())).await;
        assert!(result.is_err());
    }
}

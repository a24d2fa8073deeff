use anyhow::{Result, anyhow};
use chrono::TimeDelta;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub auth: Auth,
    pub password_reset: PasswordReset,
    pub store: Store,
    #[serde(default)]
    pub mysql: Option<MySql>,
    #[serde(default)]
    pub redis: Option<Redis>,
    pub email: Email,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Auth {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_minutes")]
    pub access_token_expire_minutes: i64,
    #[serde(default = "default_refresh_hours")]
    pub refresh_token_expire_hours: i64,
    #[serde(default = "default_presence_minutes")]
    pub presence_ttl_minutes: u64,
    #[serde(default)]
    pub rotate_refresh_tokens: bool,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_hours", &self.refresh_token_expire_hours)
            .field("presence_ttl_minutes", &self.presence_ttl_minutes)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .finish_non_exhaustive()
    }
}

impl Auth {
    pub fn access_ttl(&self) -> Result<TimeDelta> {
        lifetime(
            "auth.access_token_expire_minutes",
            self.access_token_expire_minutes,
            TimeDelta::try_minutes,
        )
    }

    pub fn refresh_ttl(&self) -> Result<TimeDelta> {
        lifetime(
            "auth.refresh_token_expire_hours",
            self.refresh_token_expire_hours,
            TimeDelta::try_hours,
        )
    }

    pub fn presence_ttl(&self) -> Result<Duration> {
        let name = "auth.presence_ttl_minutes";
        if self.presence_ttl_minutes == 0 {
            return Err(anyhow!("{} must be greater than zero", name));
        }
        self.presence_ttl_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| anyhow!("{} is out of range: {}", name, self.presence_ttl_minutes))
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    #[serde(default = "default_reset_minutes")]
    pub token_expire_minutes: i64,
    pub link_base: String,
    pub token_secret: String,
}

impl PasswordReset {
    pub fn token_ttl(&self) -> Result<TimeDelta> {
        lifetime(
            "password_reset.token_expire_minutes",
            self.token_expire_minutes,
            TimeDelta::try_minutes,
        )
    }
}

/// A configured lifetime must be positive and fit in a `TimeDelta`.
fn lifetime(name: &str, value: i64, unit: fn(i64) -> Option<TimeDelta>) -> Result<TimeDelta> {
    if value <= 0 {
        return Err(anyhow!("{} must be greater than zero, got {}", name, value));
    }
    unit(value).ok_or_else(|| anyhow!("{} is out of range: {}", name, value))
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "fake" or "real"
}

#[derive(Debug, Deserialize)]
pub struct MySql {
    pub dsn: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
    pub dsn: String,
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Email {
    pub backend: String, // "fake" or "real"
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub sender: String,
}

fn default_access_minutes() -> i64 {
    15
}

fn default_refresh_hours() -> i64 {
    72
}

fn default_presence_minutes() -> u64 {
    15
}

fn default_reset_minutes() -> i64 {
    15
}

fn default_max_connections() -> u32 {
    10
}

fn default_redis_prefix() -> String {
    "keystone".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file, then applies `APP_SECTION__KEY` environment overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const MINIMAL: &str = r#"
        [http]
        address = "127.0.0.1:8080"

        [log]
        filter = "info"

        [auth]
        access_secret = "a"
        refresh_secret = "r"

        [password_reset]
        link_base = "https://example.com/reset_password"
        token_secret = "t"

        [store]
        backend = "fake"

        [email]
        backend = "fake"
    "#;

    #[test]
    fn defaults_fill_missing_values() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(MINIMAL, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.auth.access_token_expire_minutes, 15);
        assert_eq!(settings.auth.refresh_token_expire_hours, 72);
        assert_eq!(settings.auth.presence_ttl_minutes, 15);
        assert!(!settings.auth.rotate_refresh_tokens);
        assert_eq!(settings.password_reset.token_expire_minutes, 15);
        assert!(settings.http.cert_path.is_none());
        assert!(settings.mysql.is_none());
        assert_eq!(settings.email.port, 587);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(MINIMAL, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let dump = format!("{:?}", settings.auth);
        assert!(!dump.contains("access_secret"));
    }

    fn with_auth(extra: &str) -> Settings {
        let toml = MINIMAL.replace("[auth]", &format!("[auth]\n{}", extra));
        Config::builder()
            .add_source(File::from_str(&toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn default_lifetimes_are_valid() {
        let settings = with_auth("");
        assert_eq!(settings.auth.access_ttl().unwrap(), TimeDelta::minutes(15));
        assert_eq!(settings.auth.refresh_ttl().unwrap(), TimeDelta::hours(72));
        assert_eq!(
            settings.auth.presence_ttl().unwrap(),
            Duration::from_secs(15 * 60)
        );
        assert_eq!(
            settings.password_reset.token_ttl().unwrap(),
            TimeDelta::minutes(15)
        );
    }

    #[test]
    fn zero_or_negative_lifetimes_are_rejected() {
        assert!(with_auth("refresh_token_expire_hours = 0").auth.refresh_ttl().is_err());
        assert!(with_auth("access_token_expire_minutes = -5").auth.access_ttl().is_err());
        assert!(with_auth("presence_ttl_minutes = 0").auth.presence_ttl().is_err());
    }

    #[test]
    fn oversized_lifetimes_are_errors_not_panics() {
        let settings = with_auth(&format!(
            "refresh_token_expire_hours = {}\npresence_ttl_minutes = {}",
            i64::MAX,
            i64::MAX
        ));
        assert!(settings.auth.refresh_ttl().is_err());
        assert!(settings.auth.presence_ttl().is_err());
    }
}

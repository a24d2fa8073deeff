use super::validation::validate_password;
use crate::application_port::*;
use crate::domain_port::*;
use crate::i18n::{Locale, Translator};
use crate::logger::*;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use std::sync::Arc;

#[derive(Clone)]
pub struct PasswordResetConfig {
    pub token_ttl: chrono::Duration,
    /// Reset links are `{link_base}?token={token}`.
    pub link_base: String,
    pub token_secret: Vec<u8>,
}

pub struct RealPasswordResetService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    mailer: Arc<dyn Mailer>,
    translator: Arc<Translator>,
    cfg: PasswordResetConfig,
}

impl RealPasswordResetService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        mailer: Arc<dyn Mailer>,
        translator: Arc<Translator>,
        cfg: PasswordResetConfig,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            mailer,
            translator,
            cfg,
        }
    }

    fn hmac_hex(&self, token: &str) -> Result<String, UserError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.cfg.token_secret)
            .map_err(|e| UserError::InternalError(e.to_string()))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn new_token() -> String {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[async_trait::async_trait]
impl PasswordResetService for RealPasswordResetService {
    async fn request_reset(&self, email: &str, locale: &Locale) -> Result<(), UserError> {
        let Some(user) = self.user_repo.get_by_email(email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = Self::new_token();
        let expires_at = Utc::now()
            .checked_add_signed(self.cfg.token_ttl)
            .ok_or_else(|| UserError::InternalError("reset expiry out of range".to_string()))?;
        self.user_repo
            .save_reset_token(user.id, &self.hmac_hex(&token)?, expires_at)
            .await?;

        let link = format!("{}?token={}", self.cfg.link_base, token);
        let mail = OutgoingMail {
            to: user.email,
            subject: self.translator.t(locale, "PasswordResetEmailSubject"),
            body: self
                .translator
                .t(locale, "PasswordResetEmailBody")
                .replace("{link}", &link),
        };

        let mailer = self.mailer.clone();
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(e) = mailer.send(mail).await {
                warn!(user_id = %user_id, "password reset mail not sent: {}", e);
            }
        });

        info!(user_id = %user_id, "password reset requested");
        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), UserError> {
        validate_password(new_password)?;

        let user = self
            .user_repo
            .find_by_reset_token(&self.hmac_hex(token)?)
            .await?
            .filter(|u| u.reset_token_valid_at(Utc::now()))
            .ok_or(UserError::InvalidOrExpiredToken)?;

        let hash = self.credential_hasher.hash_password(new_password).await?;
        self.user_repo.update_password(user.id, &hash).await?;

        info!(user_id = %user.id, "password reset");
        Ok(())
    }
}

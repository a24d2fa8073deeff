use crate::domain_port::*;
use crate::logger::*;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
        let sender: Mailbox = cfg
            .sender
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        let mut builder = SmtpTransport::starttls_relay(&cfg.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(cfg.port)
            .timeout(Some(Duration::from_secs(10)));
        if !cfg.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }

        info!(host = %cfg.host, port = cfg.port, "smtp mailer initialized");
        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError::Transport(e.to_string()))?;

        // lettre's SmtpTransport blocks, keep it off the runtime threads.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .map_err(|e| {
                error!(to = %mail.to, "smtp send failed: {}", e);
                MailError::Transport(e.to_string())
            })?;

        info!(to = %mail.to, "mail sent");
        Ok(())
    }
}

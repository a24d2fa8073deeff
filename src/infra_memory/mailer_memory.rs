use crate::domain_port::*;
use crate::logger::*;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Logs outgoing mail instead of sending it and keeps a copy for inspection.
#[derive(Default)]
pub struct InMemoryMailer {
    outbox: Mutex<Vec<OutgoingMail>>,
    notify: Notify,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// Waits until at least `count` messages went out.
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingMail> {
        loop {
            let notified = self.notify.notified();
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            notified.await;
        }
    }
}

#[async_trait::async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "mail captured (fake backend)");
        self.outbox
            .lock()
            .map_err(|e| MailError::Transport(e.to_string()))?
            .push(mail);
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_for_sees_background_sends() {
        let mailer = Arc::new(InMemoryMailer::new());
        let m = mailer.clone();
        tokio::spawn(async move {
            m.send(OutgoingMail {
                to: "a@x.com".to_string(),
                subject: "hi".to_string(),
                body: "body".to_string(),
            })
            .await
        });

        let sent = mailer.wait_for(1).await;
        assert_eq!(sent[0].to, "a@x.com");
    }
}

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes each message to the log instead of delivering it
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            from: format!("{} <{}>", config.from_name, config.from_email),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            "Outgoing email:\n{}",
            email.text
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_messages() {
        let mailer = LogMailer::new(&MailConfig {
            from_name: "DevCamper".into(),
            from_email: "noreply@devcamper.local".into(),
        });
        assert_eq!(mailer.from, "DevCamper <noreply@devcamper.local>");
        let email = Email {
            to: "john@gmail.com".into(),
            subject: "Password reset token".into(),
            text: "PUT http://localhost/api/v1/auth/resetpassword/abc".into(),
        };
        assert!(mailer.send(email).await.is_ok());
    }
}

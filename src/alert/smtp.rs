//! Alert delivery over SMTP.

use crate::alert::AlertSink;
use crate::config::AlertConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

/// Mails operator alerts through a STARTTLS relay.
pub struct SmtpAlerts {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpAlerts {
    /// Validates the addresses and builds the transport. Nothing is
    /// connected until the first alert goes out.
    pub fn new(config: &AlertConfig) -> Result<Self> {
        let from: Mailbox = config.from.parse().context("Invalid alert sender address")?;
        let to: Mailbox = config.to.parse().context("Invalid alert recipient address")?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .context("Failed to configure SMTP relay")?
                .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self { transport: builder.build(), from, to })
    }
}

#[async_trait]
impl AlertSink for SmtpAlerts {
    async fn notify(&self, subject: &str, body: &str) {
        let message = match Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())
        {
            Ok(message) => message,
            Err(err) => {
                warn!(subject, error = %err, "could not assemble alert mail");
                return;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => debug!(subject, "alert delivered"),
            Err(err) => warn!(subject, error = %err, "alert delivery failed"),
        }
    }
}

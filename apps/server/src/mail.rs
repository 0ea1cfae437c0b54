//! Outgoing mail.
//!
//! Delivery is fire-and-forget: callers hand a message to [`dispatch`] and
//! carry on; failures are logged and counted, never surfaced to the client.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{MailConfig, MailTransport},
    metrics::MAIL_DELIVERIES_TOTAL,
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    /// Short transport name for logs and metrics.
    fn transport(&self) -> &'static str;

    async fn send(&self, from: &str, message: &MailMessage) -> Result<()>;
}

/// Writes recipient and subject to the log. Bodies carry record numbers and
/// reset links, so they are not logged.
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    fn transport(&self) -> &'static str {
        "log"
    }

    async fn send(&self, from: &str, message: &MailMessage) -> Result<()> {
        tracing::info!(
            from = %from,
            to = %message.to,
            subject = %message.subject,
            "Mail queued (log transport)"
        );
        Ok(())
    }
}

/// Posts `{from, to, subject, text}` to an HTTP mail relay.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Mail(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    fn transport(&self) -> &'static str {
        "http"
    }

    async fn send(&self, from: &str, message: &MailMessage) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&RelayPayload {
            from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Mail(format!(
                "relay responded with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Build the sender selected by configuration.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn MailSender>> {
    match config.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Http => {
            let endpoint = config
                .http_endpoint
                .clone()
                .ok_or_else(|| Error::Mail("mail.http_endpoint is not set".to_string()))?;
            Ok(Arc::new(HttpMailer::new(
                endpoint,
                config.http_api_key.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?))
        }
    }
}

/// Send in the background.
pub fn dispatch(mailer: Arc<dyn MailSender>, from: String, message: MailMessage) {
    tokio::spawn(async move {
        let transport = mailer.transport();
        match mailer.send(&from, &message).await {
            Ok(()) => {
                MAIL_DELIVERIES_TOTAL
                    .with_label_values(&[transport, "sent"])
                    .inc();
            }
            Err(e) => {
                MAIL_DELIVERIES_TOTAL
                    .with_label_values(&[transport, "failed"])
                    .inc();
                tracing::warn!(
                    error = %e,
                    transport,
                    subject = %message.subject,
                    "Mail delivery failed"
                );
            }
        }
    });
}

pub fn registration_message(to: &str, full_name: &str, mrn: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Your medical record number".to_string(),
        body: format!(
            "Hello {full_name},\n\nYour registration is complete. \
             Your medical record number is {mrn}. Use it together with your password to sign in.\n"
        ),
    }
}

pub fn password_reset_message(to: &str, link: &str, valid_minutes: i64) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Password reset".to_string(),
        body: format!(
            "A password reset was requested for your account.\n\n\
             Open the link below within {valid_minutes} minutes to choose a new password:\n{link}\n\n\
             If you did not request this, you can ignore this message.\n"
        ),
    }
}

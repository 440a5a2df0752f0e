//! Outbound email notifications
//!
//! Notifications are advisory. Every send is fired on a background task and
//! failures are logged, never surfaced: a submission must not fail because
//! the mail provider is down.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

/// Seam for the outbound mail provider
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Fire-and-forget dispatch; the request path never waits on the provider
pub fn dispatch(notifier: Arc<dyn Notifier>, to: String, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&to, &subject, &body).await {
            tracing::warn!(to = %to, subject = %subject, error = %e, "notification failed");
        }
    });
}

/// SendGrid v3 mail send API
pub struct SendGridNotifier {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridNotifier {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("sendgrid returned {status}: {text}");
        }

        tracing::info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

/// Log-only notifier for local runs and tests
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, subject = %subject, "email (log only)");
        Ok(())
    }
}

//! Outbound notifications.
//!
//! Delivery is fire-and-forget: the monitor spawns each send and logs
//! failures, so nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::traits::Notifier;

/// A push notification built from an alert batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short summary, the joined alert names.
    pub title: String,
    /// Reading details, HTML formatted.
    pub body: String,
    /// How long the provider should keep the message. `None` never expires.
    pub ttl: Option<Duration>,
}

/// Notifier that only writes to the log.
///
/// Used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            title = %notification.title,
            ttl_secs = notification.ttl.map(|t| t.as_secs()),
            "Alert"
        );
        Ok(())
    }
}

#[cfg(feature = "pushover")]
pub use pushover::{PUSHOVER_ENDPOINT, PushoverNotifier};

#[cfg(feature = "pushover")]
mod pushover {
    use async_trait::async_trait;
    use reqwest::Client;
    use tracing::debug;

    use super::Notification;
    use crate::error::{Error, Result};
    use crate::traits::Notifier;

    /// Pushover message API.
    pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

    /// Sends notifications through the Pushover API.
    #[derive(Debug, Clone)]
    pub struct PushoverNotifier {
        client: Client,
        endpoint: String,
        token: String,
        user: String,
    }

    impl PushoverNotifier {
        /// Create a notifier for an application token and user key.
        pub fn new(token: impl Into<String>, user: impl Into<String>) -> Result<Self> {
            let token = token.into();
            let user = user.into();

            if token.trim().is_empty() {
                return Err(Error::invalid_config("Pushover token is empty"));
            }
            if user.trim().is_empty() {
                return Err(Error::invalid_config("Pushover user key is empty"));
            }

            let client = Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?;

            Ok(Self {
                client,
                endpoint: PUSHOVER_ENDPOINT.to_string(),
                token,
                user,
            })
        }

        /// Post to a different URL.
        pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
            self.endpoint = endpoint.into();
            self
        }

        /// The URL messages are posted to.
        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }

        pub(crate) fn form(&self, notification: &Notification) -> Vec<(&'static str, String)> {
            let mut form = vec![
                ("token", self.token.clone()),
                ("user", self.user.clone()),
                ("title", notification.title.clone()),
                ("message", notification.body.clone()),
                ("html", "1".to_string()),
            ];
            if let Some(ttl) = notification.ttl {
                form.push(("ttl", ttl.as_secs().to_string()));
            }
            form
        }
    }

    #[async_trait]
    impl Notifier for PushoverNotifier {
        async fn send(&self, notification: &Notification) -> Result<()> {
            let response = self
                .client
                .post(&self.endpoint)
                .form(&self.form(notification))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Notify(format!("{}: {}", status, body.trim())));
            }

            debug!("Pushover accepted \"{}\"", notification.title);
            Ok(())
        }
    }
}

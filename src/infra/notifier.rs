//! Webhook client that forwards decisions to the email automation endpoint.
//!
//! - One POST per decision, no retries.
//! - Every request carries a timeout; a timeout counts as a failed delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

use crate::domain::{ports::Notifier, NotificationPayload, NotifyError};
use crate::util::version::user_agent;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body kept in a failure message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum NotifierSetupError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<reqwest::Error> for NotifyError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            NotifyError::Timeout
        } else {
            NotifyError::Transport(value.to_string())
        }
    }
}

#[derive(Clone)]
pub struct WebhookNotifier {
    http: Client,
    endpoint: Url,
}

impl WebhookNotifier {
    pub fn new(endpoint: &str) -> Result<Self, NotifierSetupError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, NotifierSetupError> {
        let endpoint = Url::parse(endpoint)?;
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        tracing::debug!(endpoint = %self.endpoint, status = %payload.status, "posting notification");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

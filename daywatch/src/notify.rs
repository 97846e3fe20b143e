//! Notification delivery
//!
//! The watcher only ever calls [`NotificationSink::send`]; transport retries
//! are the sink's own business.

use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_RETRIES: u32 = 5;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Sends messages through the Telegram Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    retries: u32,
    retry_delay: Duration,
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Point the notifier at another Bot API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Retry transport failures and 5xx responses `retries` times, `delay` apart
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let attempts = self.retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let response = self
                .client
                .post(self.endpoint())
                .query(&[("chat_id", self.chat_id.as_str()), ("parse_mode", "Markdown")])
                .json(&json!({ "text": message }))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    debug!(attempt, "notification delivered");
                    return Ok(());
                }
                Ok(resp) if resp.status().is_server_error() => {
                    last_error = format!("server error {}", resp.status());
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(NotifyError::Rejected { status, body });
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            warn!(attempt, attempts, error = %last_error, "notification attempt failed");
            if attempt < attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(NotifyError::Exhausted {
            attempts,
            last_error,
        })
    }
}

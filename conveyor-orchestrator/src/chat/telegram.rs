//! Minimal Telegram Bot API client
//!
//! Only what the chat adapter needs: long-polling `getUpdates` and plain
//! text `sendMessage`.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

const API_BASE: &str = "https://api.telegram.org";

/// Default upper bound for a single `sendMessage` round trip
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("telegram API error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, ChatError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ChatError::Api(
                self.description
                    .unwrap_or_else(|| "request was not successful".to_string()),
            )),
        }
    }
}

#[derive(Serialize)]
struct GetUpdates {
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramClient {
    base_url: String,
    client: Client,
    send_timeout: Duration,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &format!("{}/bot<redacted>", API_BASE))
            .finish()
    }
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self::with_api_base(API_BASE, bot_token)
    }

    pub fn with_api_base(api_base: &str, bot_token: &str) -> Self {
        Self {
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            client: Client::new(),
            send_timeout: SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Long-polls for new messages, waiting up to `timeout`
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, ChatError> {
        let response = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .json(&GetUpdates {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: ["message"],
            })
            .timeout(timeout + Duration::from_secs(10))
            .send()
            .await?;

        Self::parse(response).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessage { chat_id, text })
            .timeout(self.send_timeout)
            .send()
            .await?;

        Self::parse::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ChatError> {
        let body: ApiResponse<T> = response.json().await?;
        body.into_result()
    }
}

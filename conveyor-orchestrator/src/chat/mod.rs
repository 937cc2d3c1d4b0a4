//! Chat Module
//!
//! Telegram control adapter. `ChatBot` long-polls for commands from an
//! allow-list of chats and maps them onto the controller; `ChatNotifier`
//! pushes pipeline progress to one chat.

pub mod command;
pub mod telegram;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::service::{Notifier, PipelineController, PipelineEvent};
use command::{ChatCommand, ParseError};
use telegram::{TelegramClient, Update};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub struct ChatBot {
    client: TelegramClient,
    controller: Arc<PipelineController>,
    allowed_chats: HashSet<i64>,
}

impl ChatBot {
    pub fn new(
        client: TelegramClient,
        controller: Arc<PipelineController>,
        allowed_chats: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            client,
            controller,
            allowed_chats: allowed_chats.into_iter().collect(),
        }
    }

    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chats.contains(&chat_id)
    }

    /// Polls for commands until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Chat bot listening ({} allowed chats)",
            self.allowed_chats.len()
        );

        let mut offset: Option<i64> = None;
        let mut backoff = Duration::from_secs(1);

        loop {
            let updates = tokio::select! {
                _ = shutdown.cancelled() => break,
                updates = self.client.get_updates(offset, POLL_TIMEOUT) => updates,
            };

            match updates {
                Ok(updates) => {
                    backoff = Duration::from_secs(1);
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    error!("Failed to poll chat updates: {}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        info!("Chat bot stopped");
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };
        let chat_id = message.chat.id;

        if !self.is_allowed(chat_id) {
            warn!("Ignoring message from chat {} (not allowed)", chat_id);
            return;
        }

        if let Some(reply) = self.reply_to(&text).await {
            if let Err(e) = self.client.send_message(chat_id, &reply).await {
                warn!("Failed to reply to chat {}: {}", chat_id, e);
            }
        }
    }

    async fn reply_to(&self, text: &str) -> Option<String> {
        match ChatCommand::parse(text) {
            Ok(command) => {
                debug!("Chat command: {:?}", command);
                Some(command::execute(&self.controller, command).await)
            }
            Err(ParseError::NotACommand) => None,
            Err(err) => {
                debug!("Rejected chat message {:?}: {:?}", text, err);
                err.reply()
            }
        }
    }
}

/// Sends pipeline events to one chat
pub struct ChatNotifier {
    client: TelegramClient,
    chat_id: i64,
}

impl ChatNotifier {
    pub fn new(client: TelegramClient, chat_id: i64) -> Self {
        Self { client, chat_id }
    }
}

#[async_trait]
impl Notifier for ChatNotifier {
    async fn notify(&self, event: &PipelineEvent) {
        let text = command::render_event(event);
        if let Err(e) = self.client.send_message(self.chat_id, &text).await {
            warn!("Failed to send notification to chat {}: {}", self.chat_id, e);
        }
    }
}

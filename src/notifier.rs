use std::fmt;

use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::requests::RequestClient;

/// Result of handing a message to the messaging provider.
///
/// Sending never fails outward; callers inspect the outcome instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub status: StatusCode,
    pub body: String,
}

impl SendOutcome {
    pub fn sent(text: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: format!("Message sent successfully! {text}"),
        }
    }

    pub fn rejected() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Failed to send message.".to_string(),
        }
    }

    pub fn errored() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Error occurred while sending the message.".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Telegram sends numeric ids; hand-written payloads and env config quote them.
/// Either form is sent back as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Number(id) => write!(f, "{id}"),
            ChatId::Text(id) => write!(f, "{id}"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> SendOutcome;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a ChatId,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: RequestClient,
    api_url: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(
        client: RequestClient,
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> SendOutcome {
        let request = SendMessageRequest { chat_id, text };
        let response = self
            .client
            .client()
            .post(self.send_message_url())
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("Telegram message sent to chat {}", chat_id);
                SendOutcome::sent(text)
            }
            Ok(response) => {
                warn!(
                    "Telegram rejected message to chat {} with status {}",
                    chat_id,
                    response.status()
                );
                SendOutcome::rejected()
            }
            Err(e) => {
                // The URL embeds the bot token, keep it out of the logs.
                error!(
                    "Failed to reach Telegram for chat {}: {}",
                    chat_id,
                    e.without_url()
                );
                SendOutcome::errored()
            }
        }
    }
}

//! services/api/src/adapters/telegram.rs
//!
//! Implements the `ChatBotService` port with the Telegram Bot API
//! (`getUpdates` long polling and `sendMessage`).

use std::time::Duration;

use async_trait::async_trait;
use meal_builder_core::domain::IncomingMessage;
use meal_builder_core::ports::{ChatBotService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// An adapter that talks to one Telegram bot.
#[derive(Clone)]
pub struct TelegramAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramAdapter {
    pub fn new(client: reqwest::Client, token: &str) -> Self {
        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{token}"),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }
}

//=========================================================================================
// Bot API Payloads
//=========================================================================================

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> PortResult<Option<T>> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(PortError::Unexpected(format!(
                "Telegram API error: {}",
                self.description.unwrap_or_else(|| "unknown".to_string())
            )))
        }
    }
}

fn transport(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("Telegram request failed: {e}"))
}

/// Updates without a message (edits, callbacks, ...) still advance the offset,
/// so they are passed on with no text.
fn to_incoming(update: Update) -> IncomingMessage {
    match update.message {
        Some(message) => IncomingMessage {
            update_id: update.update_id,
            chat_id: message.chat.id,
            text: message.text,
        },
        None => IncomingMessage {
            update_id: update.update_id,
            chat_id: 0,
            text: None,
        },
    }
}

#[async_trait]
impl ChatBotService for TelegramAdapter {
    async fn poll_messages(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> PortResult<Vec<IncomingMessage>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let response: ApiResponse<Vec<Update>> = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&body)
            // Leave headroom over the server-side long poll.
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        let updates = response.into_result()?.unwrap_or_default();
        Ok(updates.into_iter().map(to_incoming).collect())
    }

    async fn send_message(&self, chat_id: i64, text: &str, markdown: bool) -> PortResult<()> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: markdown.then_some("Markdown"),
        };
        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;
        response.into_result()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_decode_into_incoming_messages() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 7, "message": {"message_id": 1, "chat": {"id": 42, "type": "private"}, "text": "/plan 3"}},
                {"update_id": 8, "edited_message": {"message_id": 1, "chat": {"id": 42, "type": "private"}}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let messages: Vec<_> = response
            .into_result()
            .unwrap()
            .unwrap()
            .into_iter()
            .map(to_incoming)
            .collect();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].chat_id, 42);
        assert_eq!(messages[0].text.as_deref(), Some("/plan 3"));
        assert_eq!(messages[1].update_id, 8);
        assert!(messages[1].text.is_none());
    }

    #[test]
    fn error_responses_become_port_errors() {
        let raw = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(matches!(response.into_result(), Err(PortError::Unexpected(m)) if m.contains("Unauthorized")));
    }

    #[test]
    fn plain_messages_omit_parse_mode() {
        let body = SendMessage {
            chat_id: 1,
            text: "hi",
            parse_mode: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("parse_mode").is_none());
    }
}

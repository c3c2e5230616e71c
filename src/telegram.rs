// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::keyboard::{Button, ButtonAction, Keyboard};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Side effects the bot needs from a chat platform.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> Result<()>;

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<()>;

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: &Keyboard,
    ) -> Result<()>;

    /// Acknowledge a button press, optionally with a pop-up alert.
    async fn answer_callback(&self, query_id: &str, alert: Option<&str>) -> Result<()>;
}

/// Source of incoming updates for the polling loop.
#[async_trait::async_trait]
pub trait UpdateSource: Send + Sync {
    async fn next_updates(&self, offset: i64) -> Result<Vec<Update>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// `reply_markup` object for an inline keyboard.
pub fn reply_markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| row.iter().map(button_json).collect())
        .collect();
    json!({ "inline_keyboard": rows })
}

fn button_json(button: &Button) -> Value {
    match &button.action {
        ButtonAction::Callback(token) => json!({
            "text": button.label,
            "callback_data": token.encode(),
        }),
        ButtonAction::Url(url) => json!({
            "text": button.label,
            "url": url,
        }),
    }
}

/// Telegram Bot API over HTTPS with long polling.
pub struct TelegramApi {
    client: Client,
    api_url: String,
    token: String,
    poll_timeout_secs: u64,
}

impl TelegramApi {
    pub fn new(api_url: &str, token: String, poll_timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                // Long polls hold the connection open for the poll timeout
                .timeout(Duration::from_secs(poll_timeout_secs + 15))
                .build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            poll_timeout_secs,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        // The token is part of the URL, so only the method name is logged
        let url = format!("{}/bot{}/{}", self.api_url, self.token, method);
        debug!("Telegram call: {}", method);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{} request failed: {}", method, e.without_url()))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response ({})", method, status))?;

        if !parsed.ok {
            anyhow::bail!(
                "{} failed: {}",
                method,
                parsed.description.unwrap_or_else(|| status.to_string())
            );
        }

        parsed
            .result
            .ok_or_else(|| anyhow::anyhow!("{} returned no result", method))
    }

    /// Validates the token and returns the bot's own account.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }
}

fn with_markup(mut body: Value, keyboard: &Keyboard) -> Value {
    if !keyboard.is_empty() {
        body["reply_markup"] = reply_markup(keyboard);
    }
    body
}

#[async_trait::async_trait]
impl Transport for TelegramApi {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> Result<()> {
        let body = with_markup(
            json!({ "chat_id": chat_id, "text": text, "parse_mode": "HTML" }),
            keyboard,
        );
        self.call::<Value>("sendMessage", &body).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<()> {
        let body = with_markup(
            json!({
                "chat_id": chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": "HTML",
            }),
            keyboard,
        );
        self.call::<Value>("sendPhoto", &body).await?;
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: &Keyboard,
    ) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": reply_markup(keyboard),
        });
        self.call::<Value>("editMessageReplyMarkup", &body).await?;
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, alert: Option<&str>) -> Result<()> {
        let mut body = json!({ "callback_query_id": query_id });
        if let Some(text) = alert {
            body["text"] = json!(text);
            body["show_alert"] = json!(true);
        }
        self.call::<bool>("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl UpdateSource for TelegramApi {
    async fn next_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.get_updates(offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard;

    #[test]
    fn test_reply_markup_shapes() {
        let mut grid = keyboard::episode_page("m", 0, 1, 12);
        grid.rows.extend(keyboard::watch_now("https://cdn/x.m3u8").rows);

        let markup = reply_markup(&grid);
        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0][0],
            json!({"text": "▶️ Tập 11", "callback_data": "play|m|0|10"})
        );
        assert_eq!(
            rows[2][0],
            json!({"text": "⬅ Trang trước", "callback_data": "page|m|0|0"})
        );
        assert_eq!(
            rows[3][0],
            json!({"text": "▶️ XEM NGAY", "url": "https://cdn/x.m3u8"})
        );
    }

    #[test]
    fn test_empty_keyboard_omits_markup() {
        let body = with_markup(json!({"chat_id": 1}), &Keyboard::new());
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn test_parse_updates() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 5, "chat": {"id": 99, "type": "private"},
                    "from": {"id": 7, "is_bot": false, "first_name": "A"}, "text": "/s phim ma"}},
                {"update_id": 11, "callback_query": {"id": "q1", "from": {"id": 7, "is_bot": false, "first_name": "A"},
                    "message": {"message_id": 6, "chat": {"id": 99, "type": "private"}}, "chat_instance": "x",
                    "data": "server|phim-ma|0"}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(response.ok);
        let updates = response.result.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/s phim ma"));
        let query = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(query.data.as_deref(), Some("server|phim-ma|0"));
        assert_eq!(query.message.as_ref().unwrap().chat.id, 99);
    }

    #[test]
    fn test_parse_get_me() {
        // `User` has no Default; the envelope must not need one
        let raw = r#"{"ok": true, "result": {"id": 123, "is_bot": true, "username": "MovieBot"}}"#;
        let response: ApiResponse<User> = serde_json::from_str(raw).unwrap();
        let me = response.result.unwrap();
        assert_eq!(me.id, 123);
        assert_eq!(me.username.as_deref(), Some("MovieBot"));
    }

    #[test]
    fn test_parse_error_response() {
        let raw = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }
}

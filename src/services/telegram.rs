use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::InlineKeyboardMarkup;

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub reply_to_message_id: Option<i64>,
    pub reply_markup: Option<InlineKeyboardMarkup>,
    pub disable_web_page_preview: bool,
}

impl SendOptions {
    pub fn reply_to(message_id: i64) -> Self {
        Self {
            reply_to_message_id: Some(message_id),
            ..Self::default()
        }
    }

    pub fn with_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    pub fn no_preview(mut self) -> Self {
        self.disable_web_page_preview = true;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,

    #[serde(default)]
    result: Option<Value>,

    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Option<Value>, String> {
        if !self.has_token() {
            return Err("TELEGRAM_TOKEN is not configured".to_string());
        }

        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);
        let res = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = res.status();
        let body: ApiResponse = res
            .json()
            .await
            .map_err(|e| format!("Telegram {method}: bad response ({status}): {e}"))?;

        if !body.ok {
            let reason = body.description.unwrap_or_else(|| status.to_string());
            return Err(format!("Telegram {method} failed: {reason}"));
        }

        Ok(body.result)
    }

    fn message_payload(chat_id: i64, text: &str, opts: &SendOptions) -> Value {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": opts.disable_web_page_preview,
        });
        if let Some(id) = opts.reply_to_message_id {
            payload["reply_to_message_id"] = json!(id);
        }
        if let Some(markup) = &opts.reply_markup {
            payload["reply_markup"] = json!(markup);
        }
        payload
    }

    /// Returns the id of the sent message.
    pub async fn send_message(&self, chat_id: i64, text: &str, opts: SendOptions) -> Result<i64, String> {
        let result = self
            .call("sendMessage", Self::message_payload(chat_id, text, &opts))
            .await?;

        result
            .as_ref()
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| "Telegram sendMessage: missing message_id".to_string())
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        opts: SendOptions,
    ) -> Result<(), String> {
        let mut payload = Self::message_payload(chat_id, text, &opts);
        payload["message_id"] = json!(message_id);
        if let Some(obj) = payload.as_object_mut() {
            obj.remove("reply_to_message_id");
        }
        self.call("editMessageText", payload).await?;
        Ok(())
    }

    pub async fn pin_chat_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        self.call(
            "pinChatMessage",
            json!({ "chat_id": chat_id, "message_id": message_id, "disable_notification": true }),
        )
        .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> Result<(), String> {
        let mut payload = json!({ "callback_query_id": callback_query_id });
        if let Some(t) = text {
            payload["text"] = json!(t);
        }
        self.call("answerCallbackQuery", payload).await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        self.call(
            "deleteMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<(), String> {
        let mut payload = json!({
            "chat_id": chat_id,
            "photo": photo_url,
            "caption": caption,
            "parse_mode": "Markdown",
        });
        if let Some(id) = reply_to_message_id {
            payload["reply_to_message_id"] = json!(id);
        }
        self.call("sendPhoto", payload).await?;
        Ok(())
    }
}

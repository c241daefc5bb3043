//! Minimal Bot API client: long polling plus the two send methods the
//! engine needs.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::types::{InlineKeyboardMarkup, Message, Update, User};

/// Errors surfaced by the Bot API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TelegramError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("telegram api error {code}: {description}")]
    Api { code: i64, description: String },
}

/// Every Bot API response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

pub struct TelegramApi {
    client: Client,
    base: String,
}

impl TelegramApi {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            base: format!("https://api.telegram.org/bot{token}"),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramError> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let payload: ApiResponse<T> = response.json().await?;
        if payload.ok {
            payload.result.ok_or(TelegramError::Api {
                code: 0,
                description: "ok response without result".to_owned(),
            })
        } else {
            Err(TelegramError::Api {
                code: payload.error_code.unwrap_or_default(),
                description: payload
                    .description
                    .unwrap_or_else(|| "unknown error".to_owned()),
            })
        }
    }

    /// Identify the bot account; used once at startup as a token check.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` on HTTP or API failure.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// Long-poll for updates past `offset`.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` on HTTP or API failure.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        // request timeout must outlast the server-side long-poll window
        let request_timeout = Duration::from_secs(timeout_secs + 10);
        self.call(
            "getUpdates",
            &serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
            Some(request_timeout),
        )
        .await
    }

    /// Send a text message, optionally with an inline keyboard.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` on HTTP or API failure.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)
                .map_err(|err| TelegramError::Api {
                    code: 0,
                    description: format!("keyboard serialization failed: {err}"),
                })?;
        }
        self.call("sendMessage", &body, None).await
    }

    /// Acknowledge a callback query so the client stops its spinner.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` on HTTP or API failure.
    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &serde_json::json!({ "callback_query_id": callback_id }),
                None,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_surfaces_code_and_description() {
        let raw = r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        let payload: ApiResponse<User> = serde_json::from_str(raw).unwrap();
        assert!(!payload.ok);
        assert_eq!(payload.error_code, Some(401));
        assert_eq!(payload.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn ok_envelope_carries_result() {
        let raw = r#"{"ok":true,"result":[]}"#;
        let payload: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        assert!(payload.ok);
        assert_eq!(payload.result.unwrap().len(), 0);
    }
}

//! `ChatTransport` adapter over the Bot API client.

use std::sync::Arc;

use async_trait::async_trait;

use quiz_core::model::UserId;
use services::{ChatTransport, Keyboard, TransportError};

use crate::api::TelegramApi;
use crate::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub struct TelegramTransport {
    api: Arc<TelegramApi>,
}

impl TelegramTransport {
    #[must_use]
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api }
    }
}

/// Engine keyboards map 1:1 onto inline-keyboard rows.
fn to_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton {
                        text: button.label,
                        callback_data: button.token,
                    })
                    .collect()
            })
            .collect(),
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, user: UserId, text: &str) -> Result<(), TransportError> {
        self.api
            .send_message(user.value(), text, None)
            .await
            .map_err(|err| TransportError::Delivery(err.to_string()))?;
        Ok(())
    }

    async fn send_choices(
        &self,
        user: UserId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<(), TransportError> {
        self.api
            .send_message(user.value(), text, Some(to_markup(keyboard)))
            .await
            .map_err(|err| TransportError::Delivery(err.to_string()))?;
        Ok(())
    }
}

//! Narrow outbound interface to the chat transport, plus the callback
//! tokens the engine attaches to its buttons.

use async_trait::async_trait;
use thiserror::Error;

use quiz_core::model::UserId;

/// Errors surfaced by chat transport adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// One inline button: a visible label plus an opaque callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    #[must_use]
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Rows of buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: Vec<Button>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.rows.push(row);
        self
    }
}

/// Outbound message delivery, implemented by the transport adapter.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the message cannot be delivered.
    async fn send_text(&self, user: UserId, text: &str) -> Result<(), TransportError>;

    /// Send a text message with an inline keyboard.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the message cannot be delivered.
    async fn send_choices(
        &self,
        user: UserId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<(), TransportError>;
}

const START_TEST: &str = "start_test";
const SKIP: &str = "skip";
const MAIN_MENU: &str = "back_menu";
const ANSWER_PREFIX: &str = "ans:";

/// The callback tokens the engine understands, parsed from button clicks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    StartTest,
    Answer(String),
    Skip,
    MainMenu,
}

impl Callback {
    /// Parse an inbound callback token; unknown tokens yield `None`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            START_TEST => Some(Self::StartTest),
            SKIP => Some(Self::Skip),
            MAIN_MENU => Some(Self::MainMenu),
            _ => token
                .strip_prefix(ANSWER_PREFIX)
                .map(|option| Self::Answer(option.to_owned())),
        }
    }

    /// Render the token carried by an outbound button.
    #[must_use]
    pub fn token(&self) -> String {
        match self {
            Self::StartTest => START_TEST.to_owned(),
            Self::Skip => SKIP.to_owned(),
            Self::MainMenu => MAIN_MENU.to_owned(),
            Self::Answer(option) => format!("{ANSWER_PREFIX}{option}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_tokens() {
        assert_eq!(Callback::parse("start_test"), Some(Callback::StartTest));
        assert_eq!(Callback::parse("skip"), Some(Callback::Skip));
        assert_eq!(Callback::parse("back_menu"), Some(Callback::MainMenu));
        assert_eq!(Callback::parse("nonsense"), None);
    }

    #[test]
    fn answer_token_roundtrips() {
        let callback = Callback::Answer("42".to_owned());
        assert_eq!(Callback::parse(&callback.token()), Some(callback));
    }

    #[test]
    fn answer_option_may_contain_colons() {
        assert_eq!(
            Callback::parse("ans:12:30"),
            Some(Callback::Answer("12:30".to_owned()))
        );
    }
}

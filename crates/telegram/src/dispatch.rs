//! Maps inbound Telegram updates onto engine and registration entry
//! points, and runs the long-polling loop.

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::UserId;
use services::registration::{self, RegistrationService};
use services::{Callback, EngineError, TestEngine};

use crate::api::TelegramApi;
use crate::types::{CallbackQuery, Message, Update};

/// How an inbound plain-text message should be routed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TextRoute {
    StartCommand,
    TestCommand,
    FreeTextAnswer,
    CodeRedemption,
    Ignore,
}

fn route_text(text: &str, awaiting_free_text: bool) -> TextRoute {
    match text {
        "/start" => TextRoute::StartCommand,
        "/test" => TextRoute::TestCommand,
        // a pending free-text question claims the message before the
        // code matcher sees it
        _ if awaiting_free_text => TextRoute::FreeTextAnswer,
        _ if registration::looks_like_code(text) => TextRoute::CodeRedemption,
        _ => TextRoute::Ignore,
    }
}

pub struct UpdateDispatcher {
    engine: Arc<TestEngine>,
    registration: Arc<RegistrationService>,
    api: Arc<TelegramApi>,
}

impl UpdateDispatcher {
    #[must_use]
    pub fn new(
        engine: Arc<TestEngine>,
        registration: Arc<RegistrationService>,
        api: Arc<TelegramApi>,
    ) -> Self {
        Self {
            engine,
            registration,
            api,
        }
    }

    /// Long-poll for updates forever. Poll failures are logged and
    /// retried after a short pause; per-update handler failures never
    /// stop the loop.
    pub async fn run_polling(&self, poll_timeout_secs: u64) {
        let mut offset: i64 = 0;
        loop {
            let updates = match self.api.get_updates(offset, poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(err) => {
                    tracing::warn!(error = %err, "getUpdates failed, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(update).await;
            }
        }
    }

    /// Route a single update. Never fails: engine outcomes are logged.
    pub async fn handle_update(&self, update: Update) {
        if let Some(message) = update.message {
            self.handle_message(message).await;
        } else if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(from) = message.from else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let user = UserId::new(from.id);
        let text = text.trim();

        match route_text(text, self.engine.awaiting_free_text(user)) {
            TextRoute::StartCommand => {
                log_engine_outcome(user, self.engine.return_to_menu(user).await);
            }
            TextRoute::TestCommand => {
                log_engine_outcome(user, self.engine.begin_test(user).await);
            }
            TextRoute::FreeTextAnswer => {
                log_engine_outcome(user, self.engine.submit_free_text(user, text).await);
            }
            TextRoute::CodeRedemption => {
                if let Err(err) = self.registration.redeem(user, text).await {
                    tracing::warn!(%user, error = %err, "code redemption failed");
                }
            }
            TextRoute::Ignore => {}
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let user = UserId::new(query.from.id);
        match query.data.as_deref().and_then(Callback::parse) {
            Some(Callback::StartTest) => {
                log_engine_outcome(user, self.engine.begin_test(user).await);
            }
            Some(Callback::Answer(option)) => {
                log_engine_outcome(user, self.engine.submit_answer(user, &option).await);
            }
            Some(Callback::Skip) => {
                log_engine_outcome(user, self.engine.skip(user).await);
            }
            Some(Callback::MainMenu) => {
                log_engine_outcome(user, self.engine.return_to_menu(user).await);
            }
            None => {
                tracing::debug!(%user, data = ?query.data, "unknown callback token");
            }
        }
        if let Err(err) = self.api.answer_callback_query(&query.id).await {
            tracing::warn!(%user, error = %err, "failed to acknowledge callback");
        }
    }
}

/// Engine "errors" that are really user-visible outcomes get quieter log
/// levels; real failures are warnings.
fn log_engine_outcome(user: UserId, outcome: Result<(), EngineError>) {
    match outcome {
        Ok(()) => {}
        Err(
            err @ (EngineError::NotRegistered
            | EngineError::EmptyTaskBank
            | EngineError::NoActiveSession),
        ) => {
            tracing::debug!(%user, outcome = %err, "request declined");
        }
        Err(err) => {
            tracing::warn!(%user, error = %err, "update handling failed");
        }
    }
}

//! One-time code redemption flow.

use std::sync::Arc;

use quiz_core::model::UserId;
use storage::repository::RegistrationRepository;

use crate::engine::TestEngine;
use crate::error::RegistrationError;
use crate::messages;
use crate::transport::ChatTransport;

/// True if a trimmed inbound message looks like a registration code:
/// 4 to 10 uppercase latin letters or digits.
#[must_use]
pub fn looks_like_code(text: &str) -> bool {
    (4..=10).contains(&text.len())
        && text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Outcome of a redemption attempt; the user has been messaged either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Unbound code, now bound to this user.
    Registered,
    /// Code was already bound to this same user.
    AlreadyRegistered,
    /// Code is bound to a different user.
    CodeUsed,
    /// No such code in the store.
    InvalidCode,
}

/// Handles code-redemption messages and reports the result to the user.
pub struct RegistrationService {
    codes: Arc<dyn RegistrationRepository>,
    transport: Arc<dyn ChatTransport>,
    engine: Arc<TestEngine>,
}

impl RegistrationService {
    #[must_use]
    pub fn new(
        codes: Arc<dyn RegistrationRepository>,
        transport: Arc<dyn ChatTransport>,
        engine: Arc<TestEngine>,
    ) -> Self {
        Self {
            codes,
            transport,
            engine,
        }
    }

    /// Attempt to redeem a code for the user. An unbound code binds to the
    /// first user that redeems it; a code bound to another user is
    /// rejected. Successful (or repeated) registration leads back to the
    /// main menu.
    ///
    /// # Errors
    ///
    /// Returns storage/transport failures; the user gets a generic server
    /// error message and nothing is bound.
    pub async fn redeem(
        &self,
        user: UserId,
        code: &str,
    ) -> Result<RedeemOutcome, RegistrationError> {
        let record = match self.codes.find_by_code(code).await {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(%user, error = %err, "code lookup failed");
                self.transport
                    .send_text(user, messages::SERVER_ERROR)
                    .await?;
                return Err(err.into());
            }
        };

        let Some(record) = record else {
            self.transport
                .send_text(user, messages::INVALID_CODE)
                .await?;
            return Ok(RedeemOutcome::InvalidCode);
        };

        match record.telegram_id {
            None => {
                if let Err(err) = self.codes.bind_user(code, user).await {
                    tracing::error!(%user, error = %err, "code bind failed");
                    self.transport
                        .send_text(user, messages::BIND_FAILED)
                        .await?;
                    return Err(err.into());
                }
                tracing::info!(%user, "user registered");
                self.transport
                    .send_text(user, messages::REGISTERED)
                    .await?;
                self.engine.return_to_menu(user).await?;
                Ok(RedeemOutcome::Registered)
            }
            Some(bound) if bound == user => {
                self.transport
                    .send_text(user, messages::ALREADY_REGISTERED)
                    .await?;
                self.engine.return_to_menu(user).await?;
                Ok(RedeemOutcome::AlreadyRegistered)
            }
            Some(_) => {
                self.transport.send_text(user, messages::CODE_USED).await?;
                Ok(RedeemOutcome::CodeUsed)
            }
        }
    }
}

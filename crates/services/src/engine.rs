//! The session controller: creates, advances, times out and finalizes
//! per-user test sessions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::seq::SliceRandom;

use quiz_core::model::{Expecting, Session, TaskKind, UserId};
use quiz_core::{Clock, normalize};
use storage::repository::{RegistrationRepository, TaskRepository};

use crate::error::EngineError;
use crate::messages;
use crate::registry::{Generation, SessionRegistry};
use crate::report;
use crate::transport::{Button, Callback, ChatTransport, Keyboard};

/// Hard wall-clock ceiling on a session's total duration.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(600);

/// A message queued up during a state transition and delivered after the
/// registry lock is released.
enum Outbound {
    Text(String),
    Choices { text: String, keyboard: Keyboard },
}

/// What a grading/skip transition decided while the registry was locked.
enum SubmitPlan {
    NoSession,
    NotAwaiting,
    Batch(Vec<Outbound>),
}

/// Orchestrates the per-user quiz state machine.
///
/// Every transition locks the registry once, mutates session state and
/// queues outbound messages, then releases the lock before any transport
/// call. A timer fire and a live event for the same user therefore agree
/// on registry membership: whichever removes the session finalizes it and
/// the other observes it absent.
pub struct TestEngine {
    registry: Arc<Mutex<SessionRegistry>>,
    registrations: Arc<dyn RegistrationRepository>,
    tasks: Arc<dyn TaskRepository>,
    transport: Arc<dyn ChatTransport>,
    clock: Clock,
    time_limit: Duration,
}

impl TestEngine {
    #[must_use]
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        tasks: Arc<dyn TaskRepository>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            registry: Arc::new(Mutex::new(SessionRegistry::new())),
            registrations,
            tasks,
            transport,
            clock: Clock::default_clock(),
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }

    #[must_use]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// True if the user currently has a session in the registry.
    #[must_use]
    pub fn has_session(&self, user: UserId) -> bool {
        self.lock_registry().contains(user)
    }

    /// True if the user's session is waiting for a typed answer. The
    /// dispatcher uses this to decide whether inbound free text belongs to
    /// the engine or to the registration flow.
    #[must_use]
    pub fn awaiting_free_text(&self, user: UserId) -> bool {
        let mut reg = self.lock_registry();
        reg.get_mut(user)
            .is_some_and(|entry| entry.session.expecting() == Expecting::AwaitingFreeText)
    }

    /// Start a test for the user: check registration, load and shuffle
    /// the task bank, register the session, arm the timer and present the
    /// first task. An existing session for the user is discarded.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered`, `EmptyTaskBank`, or storage/transport
    /// failures. The user has already been messaged about each outcome.
    pub async fn begin_test(&self, user: UserId) -> Result<(), EngineError> {
        let registered = match self.registrations.find_by_user(user).await {
            Ok(record) => record.is_some(),
            Err(err) => {
                tracing::error!(%user, error = %err, "registration lookup failed");
                self.notify_server_error(user).await;
                return Err(err.into());
            }
        };
        if !registered {
            self.transport
                .send_text(user, messages::NOT_REGISTERED)
                .await?;
            return Err(EngineError::NotRegistered);
        }

        let mut tasks = match self.tasks.list_all().await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::error!(%user, error = %err, "task bank load failed");
                self.notify_server_error(user).await;
                return Err(err.into());
            }
        };
        if tasks.is_empty() {
            self.transport
                .send_text(user, messages::EMPTY_TASK_BANK)
                .await?;
            return Err(EngineError::EmptyTaskBank);
        }

        tasks.shuffle(&mut rand::rng());
        let session = Session::new(user, tasks, self.clock.now());
        let total = session.total();

        let (generation, batch) = {
            let mut reg = self.lock_registry();
            let generation = reg.insert(session);
            let mut batch = Vec::new();
            self.continue_presentation(&mut reg, user, &mut batch);
            (generation, batch)
        };
        self.spawn_timer(user, generation);
        tracing::info!(%user, tasks = total, "test session started");
        self.flush(user, batch).await
    }

    /// Grade a choice-button answer against the current task.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` (after a soft hint to the user) when no
    /// session exists, or a transport failure.
    pub async fn submit_answer(&self, user: UserId, raw: &str) -> Result<(), EngineError> {
        match self.grade(user, raw, false) {
            SubmitPlan::NoSession => {
                self.transport.send_text(user, messages::NO_SESSION).await?;
                Err(EngineError::NoActiveSession)
            }
            SubmitPlan::NotAwaiting => Ok(()),
            SubmitPlan::Batch(batch) => self.flush(user, batch).await,
        }
    }

    /// Grade an inbound free-text message as an answer. Messages that
    /// arrive while the session is not waiting for typed input are not the
    /// engine's to consume and are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns a transport failure.
    pub async fn submit_free_text(&self, user: UserId, raw: &str) -> Result<(), EngineError> {
        match self.grade(user, raw, true) {
            SubmitPlan::NoSession | SubmitPlan::NotAwaiting => Ok(()),
            SubmitPlan::Batch(batch) => self.flush(user, batch).await,
        }
    }

    /// Move the current task to the back of the queue and re-present.
    /// Silently ignored when no session exists.
    ///
    /// # Errors
    ///
    /// Returns a transport failure.
    pub async fn skip(&self, user: UserId) -> Result<(), EngineError> {
        let batch = {
            let mut reg = self.lock_registry();
            {
                let Some(entry) = reg.get_mut(user) else {
                    return Ok(());
                };
                entry.session.skip();
            }
            let mut batch = Vec::new();
            self.continue_presentation(&mut reg, user, &mut batch);
            batch
        };
        self.flush(user, batch).await
    }

    /// Unconditionally discard any session for the user (no scoring, no
    /// report) and present the top-level menu.
    ///
    /// # Errors
    ///
    /// Returns a transport failure.
    pub async fn return_to_menu(&self, user: UserId) -> Result<(), EngineError> {
        {
            let mut reg = self.lock_registry();
            reg.remove(user);
        }
        self.transport
            .send_choices(user, messages::MAIN_MENU, messages::main_menu_keyboard())
            .await?;
        Ok(())
    }

    fn grade(&self, user: UserId, raw: &str, require_free_text: bool) -> SubmitPlan {
        let mut reg = self.lock_registry();
        let graded = {
            let Some(entry) = reg.get_mut(user) else {
                return SubmitPlan::NoSession;
            };
            let session = &mut entry.session;
            if require_free_text && session.expecting() != Expecting::AwaitingFreeText {
                return SubmitPlan::NotAwaiting;
            }
            let Some(task) = session.current() else {
                return SubmitPlan::NotAwaiting;
            };
            let (expected, question, explanation) = (
                task.answer().to_owned(),
                task.question().to_owned(),
                task.explanation().to_owned(),
            );

            let correct = normalize(raw) == normalize(&expected);
            if correct {
                session.record_correct();
            } else {
                session.record_miss(question, explanation);
            }
            session.advance();
            correct
        };

        let feedback = if graded {
            messages::CORRECT
        } else {
            messages::INCORRECT
        };
        let mut batch = vec![Outbound::Text(feedback.to_owned())];
        self.continue_presentation(&mut reg, user, &mut batch);
        SubmitPlan::Batch(batch)
    }

    /// Present the current task, auto-advancing over unscored items, and
    /// finalize when the queue is exhausted. Runs entirely under the
    /// registry lock; delivery happens later from the queued batch.
    fn continue_presentation(
        &self,
        reg: &mut SessionRegistry,
        user: UserId,
        batch: &mut Vec<Outbound>,
    ) {
        enum Render {
            Finalize,
            Prompt(Outbound),
            AutoAdvance(Outbound),
        }

        loop {
            let render = {
                let Some(entry) = reg.get_mut(user) else {
                    return;
                };
                let session = &mut entry.session;
                let step = session
                    .current()
                    .map(|task| (task.kind().clone(), task.question().to_owned()));
                match step {
                    None => {
                        session.set_expecting(Expecting::Finalizing);
                        Render::Finalize
                    }
                    Some((TaskKind::Choice { options }, question)) => {
                        session.set_expecting(Expecting::AwaitingChoice);
                        Render::Prompt(choice_prompt(&question, &options))
                    }
                    Some((TaskKind::FreeText, question)) => {
                        session.set_expecting(Expecting::AwaitingFreeText);
                        Render::Prompt(free_text_prompt(&question))
                    }
                    Some((TaskKind::Unscored, question)) => {
                        session.advance();
                        Render::AutoAdvance(Outbound::Text(messages::question(&question)))
                    }
                }
            };

            match render {
                Render::Finalize => {
                    let Some(session) = reg.remove(user) else {
                        return;
                    };
                    let elapsed = self.clock.now() - session.started_at();
                    tracing::info!(
                        %user,
                        correct = session.correct(),
                        total = session.total(),
                        elapsed_secs = elapsed.num_seconds(),
                        "session finished"
                    );
                    let (text, keyboard) = report::render(&session);
                    batch.push(Outbound::Choices { text, keyboard });
                    return;
                }
                Render::Prompt(outbound) => {
                    batch.push(outbound);
                    return;
                }
                Render::AutoAdvance(outbound) => {
                    batch.push(outbound);
                }
            }
        }
    }

    /// Arm the time-limit timer. The spawned task owns its own clones of
    /// the registry and transport handles.
    fn spawn_timer(&self, user: UserId, generation: Generation) {
        let registry = Arc::clone(&self.registry);
        let transport = Arc::clone(&self.transport);
        let limit = self.time_limit;
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            expire(&registry, transport.as_ref(), user, generation).await;
        });
    }

    async fn flush(&self, user: UserId, batch: Vec<Outbound>) -> Result<(), EngineError> {
        deliver(self.transport.as_ref(), user, batch).await
    }

    async fn notify_server_error(&self, user: UserId) {
        if let Err(err) = self.transport.send_text(user, messages::SERVER_ERROR).await {
            tracing::warn!(%user, error = %err, "failed to deliver error message");
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, SessionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Timer fire: finalize the session only if it is still the one the
/// timer was armed for. A generation mismatch or an absent entry means
/// the session was already finalized (or replaced) and the fire is
/// stale, which is not an error.
async fn expire(
    registry: &Mutex<SessionRegistry>,
    transport: &dyn ChatTransport,
    user: UserId,
    generation: Generation,
) {
    let batch = {
        let mut reg = registry.lock().unwrap_or_else(PoisonError::into_inner);
        match reg.remove_if_generation(user, generation) {
            Some(session) => {
                tracing::info!(
                    %user,
                    correct = session.correct(),
                    total = session.total(),
                    "time limit reached, finalizing session"
                );
                let (text, keyboard) = report::render(&session);
                vec![Outbound::Choices { text, keyboard }]
            }
            None => return,
        }
    };
    if let Err(err) = deliver(transport, user, batch).await {
        tracing::warn!(%user, error = %err, "failed to deliver timeout report");
    }
}

async fn deliver(
    transport: &dyn ChatTransport,
    user: UserId,
    batch: Vec<Outbound>,
) -> Result<(), EngineError> {
    for outbound in batch {
        match outbound {
            Outbound::Text(text) => transport.send_text(user, &text).await?,
            Outbound::Choices { text, keyboard } => {
                transport.send_choices(user, &text, keyboard).await?;
            }
        }
    }
    Ok(())
}

fn choice_prompt(question: &str, options: &[String]) -> Outbound {
    let mut keyboard = Keyboard::new();
    for option in options {
        keyboard.push_row(vec![Button::new(
            option.clone(),
            Callback::Answer(option.clone()).token(),
        )]);
    }
    keyboard.push_row(vec![Button::new(messages::SKIP_BUTTON, Callback::Skip.token())]);
    keyboard.push_row(vec![Button::new(
        messages::MENU_BUTTON,
        Callback::MainMenu.token(),
    )]);
    Outbound::Choices {
        text: messages::question(question),
        keyboard,
    }
}

fn free_text_prompt(question: &str) -> Outbound {
    let keyboard = Keyboard::new()
        .with_row(vec![Button::new(messages::SKIP_BUTTON, Callback::Skip.token())])
        .with_row(vec![Button::new(
            messages::MENU_BUTTON,
            Callback::MainMenu.token(),
        )]);
    Outbound::Choices {
        text: format!(
            "{}\n\n{}",
            messages::question(question),
            messages::FREE_TEXT_PROMPT
        ),
        keyboard,
    }
}

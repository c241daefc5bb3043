use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::model::{Task, TaskId, TaskKind, UserId};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One row of the registration (one-time code) table.
///
/// `telegram_id` is null until the code is redeemed; after that it pins the
/// code to a single chat user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub code: String,
    pub telegram_id: Option<UserId>,
}

/// Persisted shape of a task row, as the task bank stores it.
///
/// Every field except the id may be absent or malformed in real data, so
/// the conversion into a domain `Task` degrades instead of failing: a
/// missing question becomes a placeholder, missing answer/explanation
/// become empty, an unknown kind becomes `TaskKind::Unscored`, and options
/// that fail to parse as a JSON array become a single-element list.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Placeholder question text for rows with a missing question.
const MISSING_QUESTION: &str = "(вопрос пропущен)";

impl TaskRecord {
    /// Convert the record into a domain `Task`, degrading gracefully on
    /// malformed fields.
    #[must_use]
    pub fn into_task(self) -> Task {
        let kind = match self.kind.as_deref() {
            Some("choice") | None => TaskKind::Choice {
                options: parse_options(self.options),
            },
            Some("text") => TaskKind::FreeText,
            Some(_) => TaskKind::Unscored,
        };
        Task::new(
            TaskId::new(self.id),
            kind,
            self.question
                .unwrap_or_else(|| MISSING_QUESTION.to_owned()),
            self.answer.unwrap_or_default(),
            self.explanation.unwrap_or_default(),
        )
    }
}

/// Decode the stored `options` column into an ordered list of strings.
///
/// The column may hold a real JSON/SQL array or a serialized JSON array as
/// text; text that fails to parse is kept as a single option rather than
/// failing the whole load.
fn parse_options(raw: Option<serde_json::Value>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(serde_json::Value::String(text)) => serde_json::from_str::<Vec<String>>(&text)
            .unwrap_or_else(|_| vec![text]),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    }
}

/// Repository contract for the one-time code registrations.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Fetch the record for a code, if the code exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on a failed backend call.
    async fn find_by_code(&self, code: &str) -> Result<Option<RegistrationRecord>, StorageError>;

    /// Fetch the record bound to a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on a failed backend call.
    async fn find_by_user(&self, user: UserId) -> Result<Option<RegistrationRecord>, StorageError>;

    /// Bind a code to a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the update cannot be applied.
    async fn bind_user(&self, code: &str, user: UserId) -> Result<(), StorageError>;
}

/// Repository contract for the task bank.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Load every task in the bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on a failed backend call.
    async fn list_all(&self) -> Result<Vec<Task>, StorageError>;
}

/// Simple in-memory storage implementation for testing and local runs.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    codes: Arc<Mutex<HashMap<String, Option<UserId>>>>,
    tasks: Arc<Mutex<Vec<Task>>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an unbound (or pre-bound) registration code.
    pub fn add_code(&self, code: impl Into<String>, bound_to: Option<UserId>) {
        let mut guard = lock_or_recover(&self.codes);
        guard.insert(code.into(), bound_to);
    }

    /// Seed a task into the bank.
    pub fn add_task(&self, task: Task) {
        let mut guard = lock_or_recover(&self.tasks);
        guard.push(task);
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl RegistrationRepository for InMemoryStorage {
    async fn find_by_code(&self, code: &str) -> Result<Option<RegistrationRecord>, StorageError> {
        let guard = lock_or_recover(&self.codes);
        Ok(guard.get(code).map(|bound| RegistrationRecord {
            code: code.to_owned(),
            telegram_id: *bound,
        }))
    }

    async fn find_by_user(&self, user: UserId) -> Result<Option<RegistrationRecord>, StorageError> {
        let guard = lock_or_recover(&self.codes);
        Ok(guard
            .iter()
            .find(|(_, bound)| **bound == Some(user))
            .map(|(code, bound)| RegistrationRecord {
                code: code.clone(),
                telegram_id: *bound,
            }))
    }

    async fn bind_user(&self, code: &str, user: UserId) -> Result<(), StorageError> {
        let mut guard = lock_or_recover(&self.codes);
        match guard.get_mut(code) {
            Some(bound) => {
                *bound = Some(user);
                Ok(())
            }
            None => Err(StorageError::Connection(format!("unknown code: {code}"))),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryStorage {
    async fn list_all(&self) -> Result<Vec<Task>, StorageError> {
        let guard = lock_or_recover(&self.tasks);
        Ok(guard.clone())
    }
}

/// Aggregates the registration and task repositories behind trait objects
/// for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub registrations: Arc<dyn RegistrationRepository>,
    pub tasks: Arc<dyn TaskRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStorage::new();
        Self::from_in_memory(store)
    }

    #[must_use]
    pub fn from_in_memory(store: InMemoryStorage) -> Self {
        let registrations: Arc<dyn RegistrationRepository> = Arc::new(store.clone());
        let tasks: Arc<dyn TaskRepository> = Arc::new(store);
        Self {
            registrations,
            tasks,
        }
    }
}

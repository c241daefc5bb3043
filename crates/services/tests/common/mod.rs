//! Shared fixtures: a recording chat transport and task builders.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quiz_core::model::{Task, TaskId, TaskKind, UserId};
use services::{ChatTransport, Keyboard, TestEngine, TransportError};
use storage::repository::InMemoryStorage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { user: UserId, text: String },
    Choices {
        user: UserId,
        text: String,
        keyboard: Keyboard,
    },
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Text { text, .. } | Sent::Choices { text, .. } => text,
        }
    }
}

/// Transport double that records every outbound message.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, user: UserId, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(Sent::Text {
            user,
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn send_choices(
        &self,
        user: UserId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(Sent::Choices {
            user,
            text: text.to_owned(),
            keyboard,
        });
        Ok(())
    }
}

pub fn build_choice_task(id: i64, question: &str, options: &[&str], answer: &str) -> Task {
    Task::new(
        TaskId::new(id),
        TaskKind::Choice {
            options: options.iter().map(|s| (*s).to_owned()).collect(),
        },
        question,
        answer,
        format!("explanation for {question}"),
    )
}

pub fn build_text_task(id: i64, question: &str, answer: &str) -> Task {
    Task::new(
        TaskId::new(id),
        TaskKind::FreeText,
        question,
        answer,
        format!("explanation for {question}"),
    )
}

pub fn build_unscored_task(id: i64, question: &str) -> Task {
    Task::new(TaskId::new(id), TaskKind::Unscored, question, "", "")
}

/// Engine over in-memory storage and a recording transport.
pub fn build_engine(store: &InMemoryStorage) -> (Arc<TestEngine>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let engine = Arc::new(TestEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
    ));
    (engine, transport)
}

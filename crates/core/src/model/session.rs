use chrono::{DateTime, Utc};

use super::{Task, UserId};

/// What kind of inbound event the session will accept next.
///
/// Set on every presentation; `Finalizing` marks a session whose queue is
/// exhausted and which must never be advanced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expecting {
    AwaitingChoice,
    AwaitingFreeText,
    Finalizing,
}

/// A question the user got wrong, paired with its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissedTask {
    pub question: String,
    pub explanation: String,
}

/// One user's in-progress test.
///
/// Owns a session-exclusive (already shuffled) task queue and tracks the
/// running score. Invariant: `0 <= position <= queue.len()`; when
/// `position == queue.len()` the session is exhausted and must be finalized.
/// `total` is the queue length at session start and stays the report
/// denominator regardless of later skips.
#[derive(Debug, Clone)]
pub struct Session {
    owner: UserId,
    queue: Vec<Task>,
    position: usize,
    correct: u32,
    missed: Vec<MissedTask>,
    expecting: Expecting,
    total: usize,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Create a session over an already-ordered task queue.
    ///
    /// Shuffling happens in the engine so the model stays deterministic.
    #[must_use]
    pub fn new(owner: UserId, queue: Vec<Task>, started_at: DateTime<Utc>) -> Self {
        let total = queue.len();
        Self {
            owner,
            queue,
            position: 0,
            correct: 0,
            missed: Vec::new(),
            expecting: Expecting::AwaitingChoice,
            total,
            started_at,
        }
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Report denominator: queue length at session start.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn missed(&self) -> &[MissedTask] {
        &self.missed
    }

    #[must_use]
    pub fn expecting(&self) -> Expecting {
        self.expecting
    }

    pub fn set_expecting(&mut self, expecting: Expecting) {
        self.expecting = expecting;
    }

    /// The task at the current position, or `None` when the queue is
    /// exhausted.
    #[must_use]
    pub fn current(&self) -> Option<&Task> {
        self.queue.get(self.position)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.queue.len()
    }

    /// Move past the current task. Saturates at the queue end so the
    /// position invariant holds even on a stray extra call.
    pub fn advance(&mut self) {
        if self.position < self.queue.len() {
            self.position += 1;
        }
    }

    /// Move the current task to the back of the queue without advancing.
    ///
    /// The task at the current index becomes whatever was previously next;
    /// the skipped task resurfaces only after every other remaining task
    /// has been shown. Queue length never changes. When it is the only
    /// task left it resurfaces immediately.
    pub fn skip(&mut self) {
        if self.position < self.queue.len() {
            let task = self.queue.remove(self.position);
            self.queue.push(task);
        }
    }

    pub fn record_correct(&mut self) {
        self.correct += 1;
    }

    pub fn record_miss(&mut self, question: impl Into<String>, explanation: impl Into<String>) {
        self.missed.push(MissedTask {
            question: question.into(),
            explanation: explanation.into(),
        });
    }
}

use super::TaskId;

/// Interaction shape of a task, one variant per stored kind.
///
/// Anything the task bank stores under an unrecognized kind becomes
/// `Unscored`: the question is shown without controls, skipped over, and
/// never counted in the score or the missed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Choice { options: Vec<String> },
    FreeText,
    Unscored,
}

impl TaskKind {
    #[must_use]
    pub fn is_scored(&self) -> bool {
        !matches!(self, TaskKind::Unscored)
    }
}

/// One quiz item: a question, its expected answer and the explanation
/// shown when the answer is missed.
///
/// Tasks are immutable once loaded from the task bank; each session holds
/// its own shuffled copy, never a shared reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    question: String,
    answer: String,
    explanation: String,
}

impl Task {
    #[must_use]
    pub fn new(
        id: TaskId,
        kind: TaskKind,
        question: impl Into<String>,
        answer: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            question: question.into(),
            answer: answer.into(),
            explanation: explanation.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

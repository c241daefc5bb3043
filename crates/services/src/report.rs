//! Rendering of the final score summary for a finished session.

use quiz_core::model::Session;

use crate::messages;
use crate::transport::{Button, Callback, Keyboard};

/// Render the summary for a finalized session: score over the queue
/// length at session start, plus every missed question with its
/// explanation in the order the misses happened.
#[must_use]
pub fn render(session: &Session) -> (String, Keyboard) {
    let mut text = format!(
        "{}\n\nПравильных ответов: {}/{}\n",
        messages::REPORT_HEADER,
        session.correct(),
        session.total()
    );

    if !session.missed().is_empty() {
        text.push_str(&format!("\n{}\n", messages::REPORT_MISSES_HEADER));
        for miss in session.missed() {
            text.push_str(&format!("\n❌ {}\nℹ️ {}\n", miss.question, miss.explanation));
        }
    }

    let keyboard = Keyboard::new()
        .with_row(vec![Button::new(
            messages::RETAKE_BUTTON,
            Callback::StartTest.token(),
        )])
        .with_row(vec![Button::new(
            messages::MENU_BUTTON,
            Callback::MainMenu.token(),
        )]);

    (text, keyboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Task, TaskId, TaskKind, UserId};
    use quiz_core::time::fixed_now;

    fn build_session(task_count: i64) -> Session {
        let queue = (1..=task_count)
            .map(|id| {
                Task::new(
                    TaskId::new(id),
                    TaskKind::FreeText,
                    format!("Q{id}"),
                    "A",
                    format!("E{id}"),
                )
            })
            .collect();
        Session::new(UserId::new(1), queue, fixed_now())
    }

    #[test]
    fn perfect_score_omits_miss_list() {
        let mut session = build_session(2);
        session.record_correct();
        session.record_correct();
        let (text, keyboard) = render(&session);
        assert!(text.contains("2/2"));
        assert!(!text.contains(messages::REPORT_MISSES_HEADER));
        assert_eq!(keyboard.rows.len(), 2);
    }

    #[test]
    fn misses_are_listed_in_insertion_order() {
        let mut session = build_session(2);
        session.record_miss("Q1", "E1");
        session.record_miss("Q2", "E2");
        let (text, _) = render(&session);
        assert!(text.contains("0/2"));
        let first = text.find("Q1").unwrap();
        let second = text.find("Q2").unwrap();
        assert!(first < second);
        assert!(text.contains("E1"));
    }

    #[test]
    fn denominator_is_queue_length_at_start() {
        let mut session = build_session(3);
        session.skip();
        session.skip();
        let (text, _) = render(&session);
        assert!(text.contains("0/3"));
    }
}

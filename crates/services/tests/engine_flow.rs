mod common;

use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::UserId;
use services::{EngineError, TestEngine};
use storage::repository::InMemoryStorage;

use common::{
    RecordingTransport, Sent, build_choice_task, build_engine, build_text_task,
    build_unscored_task,
};

const USER: UserId = UserId::new(100);

fn registered_store() -> InMemoryStorage {
    let store = InMemoryStorage::new();
    store.add_code("AB12", Some(USER));
    store
}

fn two_task_store() -> InMemoryStorage {
    let store = registered_store();
    store.add_task(build_choice_task(1, "2+2?", &["3", "4"], "4"));
    store.add_task(build_text_task(2, "Capital of France?", "Paris"));
    store
}

/// The question text of the most recent prompt, without the prefix and
/// the free-text hint.
fn current_question(transport: &RecordingTransport) -> String {
    let last = transport.last().expect("a prompt was sent");
    last.text()
        .trim_start_matches("❓ ")
        .lines()
        .next()
        .expect("prompt has a first line")
        .to_owned()
}

/// Answer whatever task is currently presented. The queue is shuffled, so
/// the test reads the prompt to know which task is up.
async fn answer_current(
    engine: &Arc<TestEngine>,
    transport: &RecordingTransport,
    correctly: bool,
) {
    let question = current_question(transport);
    let answer = match (question.as_str(), correctly) {
        ("2+2?", true) => "4",
        ("2+2?", false) => "3",
        // mixed case on purpose: normalization must absorb it
        ("Capital of France?", true) => "  PARIS ",
        ("Capital of France?", false) => "Berlin",
        (other, _) => panic!("unexpected question: {other}"),
    };
    if engine.awaiting_free_text(USER) {
        engine.submit_free_text(USER, answer).await.unwrap();
    } else {
        engine.submit_answer(USER, answer).await.unwrap();
    }
}

#[tokio::test]
async fn perfect_run_reports_full_score() {
    let store = two_task_store();
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    answer_current(&engine, &transport, true).await;
    answer_current(&engine, &transport, true).await;

    assert!(!engine.has_session(USER));
    let report = transport.last().unwrap();
    assert!(report.text().contains("2/2"));
    assert!(!report.text().contains("Ошибки"));

    let texts: Vec<_> = transport.sent();
    let correct_count = texts
        .iter()
        .filter(|sent| sent.text() == services::messages::CORRECT)
        .count();
    assert_eq!(correct_count, 2);
}

#[tokio::test]
async fn wrong_answers_are_reported_in_submission_order() {
    let store = two_task_store();
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    let first_question = current_question(&transport);
    answer_current(&engine, &transport, false).await;
    let second_question = current_question(&transport);
    answer_current(&engine, &transport, false).await;

    let report = transport.last().unwrap();
    assert!(report.text().contains("0/2"));
    assert!(report.text().contains("Ошибки"));
    let first_pos = report.text().find(&first_question).unwrap();
    let second_pos = report.text().find(&second_question).unwrap();
    assert!(first_pos < second_pos);
    assert!(report.text().contains("explanation for 2+2?"));
    assert!(!engine.has_session(USER));
}

#[tokio::test]
async fn return_to_menu_discards_session_without_report() {
    let store = two_task_store();
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    engine.return_to_menu(USER).await.unwrap();

    assert!(!engine.has_session(USER));
    let report_sent = transport
        .sent()
        .iter()
        .any(|sent| sent.text().contains("Тест завершён"));
    assert!(!report_sent);
    assert_eq!(
        transport.last().unwrap().text(),
        services::messages::MAIN_MENU
    );
}

#[tokio::test]
async fn skip_reorders_without_changing_denominator() {
    let store = two_task_store();
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    let first = current_question(&transport);
    engine.skip(USER).await.unwrap();
    let second = current_question(&transport);
    assert_ne!(first, second);

    answer_current(&engine, &transport, true).await;
    // the skipped task resurfaces after every other task has been shown
    assert_eq!(current_question(&transport), first);
    answer_current(&engine, &transport, true).await;

    assert!(transport.last().unwrap().text().contains("2/2"));
}

#[tokio::test]
async fn skipping_the_only_remaining_task_re_presents_it() {
    let store = registered_store();
    store.add_task(build_choice_task(1, "2+2?", &["3", "4"], "4"));
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    engine.skip(USER).await.unwrap();
    assert_eq!(current_question(&transport), "2+2?");
    assert!(engine.has_session(USER));
}

#[tokio::test]
async fn unscored_tasks_auto_advance_without_scoring() {
    let store = registered_store();
    store.add_task(build_unscored_task(1, "Just read this."));
    store.add_task(build_unscored_task(2, "And this."));
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();

    // both presented without controls, then the report follows immediately
    assert!(!engine.has_session(USER));
    let report = transport.last().unwrap();
    assert!(report.text().contains("0/2"));
    assert!(!report.text().contains("Ошибки"));
    let plain_questions = transport
        .sent()
        .iter()
        .filter(|sent| matches!(sent, Sent::Text { .. }))
        .count();
    assert_eq!(plain_questions, 2);
}

#[tokio::test]
async fn unregistered_user_cannot_begin() {
    let store = InMemoryStorage::new();
    store.add_task(build_choice_task(1, "2+2?", &["3", "4"], "4"));
    let (engine, transport) = build_engine(&store);

    let err = engine.begin_test(USER).await.unwrap_err();
    assert!(matches!(err, EngineError::NotRegistered));
    assert!(!engine.has_session(USER));
    assert_eq!(
        transport.last().unwrap().text(),
        services::messages::NOT_REGISTERED
    );
}

#[tokio::test]
async fn empty_task_bank_aborts_start() {
    let store = registered_store();
    let (engine, transport) = build_engine(&store);

    let err = engine.begin_test(USER).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyTaskBank));
    assert!(!engine.has_session(USER));
    assert_eq!(
        transport.last().unwrap().text(),
        services::messages::EMPTY_TASK_BANK
    );
}

#[tokio::test]
async fn answer_without_session_is_a_soft_hint() {
    let store = two_task_store();
    let (engine, transport) = build_engine(&store);

    let err = engine.submit_answer(USER, "4").await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveSession));
    assert_eq!(
        transport.last().unwrap().text(),
        services::messages::NO_SESSION
    );

    // skip and free text are dropped silently
    let before = transport.sent_count();
    engine.skip(USER).await.unwrap();
    engine.submit_free_text(USER, "4").await.unwrap();
    assert_eq!(transport.sent_count(), before);
}

#[tokio::test]
async fn free_text_is_ignored_while_a_choice_is_pending() {
    let store = registered_store();
    store.add_task(build_choice_task(1, "2+2?", &["3", "4"], "4"));
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    assert!(!engine.awaiting_free_text(USER));

    let before = transport.sent_count();
    engine.submit_free_text(USER, "4").await.unwrap();
    assert_eq!(transport.sent_count(), before);
    assert!(engine.has_session(USER));
}

#[tokio::test]
async fn starting_again_replaces_the_active_session() {
    let store = two_task_store();
    let (engine, transport) = build_engine(&store);

    engine.begin_test(USER).await.unwrap();
    answer_current(&engine, &transport, true).await;
    engine.begin_test(USER).await.unwrap();

    // the replacement session starts from scratch
    answer_current(&engine, &transport, true).await;
    answer_current(&engine, &transport, true).await;
    assert!(transport.last().unwrap().text().contains("2/2"));
}

#[tokio::test]
async fn timer_finalizes_a_running_session() {
    let store = two_task_store();
    let transport = Arc::new(RecordingTransport::new());
    let engine = Arc::new(
        TestEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::clone(&transport) as Arc<dyn services::ChatTransport>,
        )
        .with_time_limit(Duration::from_millis(50)),
    );

    engine.begin_test(USER).await.unwrap();
    assert!(engine.has_session(USER));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!engine.has_session(USER));
    assert!(transport.last().unwrap().text().contains("Тест завершён"));

    // a stray event after finalization is a no-op
    let before = transport.sent_count();
    engine.skip(USER).await.unwrap();
    assert_eq!(transport.sent_count(), before);
}

#[tokio::test]
async fn stale_timer_fire_is_a_no_op() {
    let store = two_task_store();
    let transport = Arc::new(RecordingTransport::new());
    let engine = Arc::new(
        TestEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::clone(&transport) as Arc<dyn services::ChatTransport>,
        )
        .with_time_limit(Duration::from_millis(50)),
    );

    engine.begin_test(USER).await.unwrap();
    engine.return_to_menu(USER).await.unwrap();

    let before = transport.sent_count();
    tokio::time::sleep(Duration::from_millis(200)).await;
    // the armed timer fired against a finalized session: nothing happens
    assert_eq!(transport.sent_count(), before);
    assert!(!engine.has_session(USER));
}

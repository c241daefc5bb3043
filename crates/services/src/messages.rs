//! All user-facing strings in one place so the bot reads consistently.

use crate::transport::{Button, Callback, Keyboard};

pub const MAIN_MENU: &str = "🏠 Главное меню";
pub const START_TEST_BUTTON: &str = "📝 Пройти тестирование";
pub const SKIP_BUTTON: &str = "⏭ Пропустить";
pub const MENU_BUTTON: &str = "🏠 Главное меню";
pub const RETAKE_BUTTON: &str = "🔄 Пройти ещё раз";

pub const SERVER_ERROR: &str = "Ошибка сервера. Попробуй позже.";
pub const NOT_REGISTERED: &str = "❌ Сначала зарегистрируйся с помощью индивидуального кода.";
pub const EMPTY_TASK_BANK: &str = "В базе нет задач или произошла ошибка.";
pub const NO_SESSION: &str = "Сессия не найдена. Нажми /test или вернись в меню.";

pub const CORRECT: &str = "✅ Верно!";
pub const INCORRECT: &str = "❌ Неверно!";

pub const FREE_TEXT_PROMPT: &str = "✍ Введи ответ сообщением:";

pub const INVALID_CODE: &str = "❌ Неверный код.";
pub const CODE_USED: &str = "❌ Этот код уже использован другим пользователем.";
pub const REGISTERED: &str = "✅ Регистрация успешна! Добро пожаловать.";
pub const ALREADY_REGISTERED: &str = "✅ Ты уже зарегистрирован.";
pub const BIND_FAILED: &str = "Ошибка при привязке кода. Напиши позже.";

pub const REPORT_HEADER: &str = "🏁 Тест завершён!";
pub const REPORT_MISSES_HEADER: &str = "Ошибки:";

/// Question prefix used for every presented task.
#[must_use]
pub fn question(text: &str) -> String {
    format!("❓ {text}")
}

/// The single-button top-level menu keyboard.
#[must_use]
pub fn main_menu_keyboard() -> Keyboard {
    Keyboard::new().with_row(vec![Button::new(
        START_TEST_BUTTON,
        Callback::StartTest.token(),
    )])
}

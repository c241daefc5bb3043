#![forbid(unsafe_code)]

pub mod api;
pub mod dispatch;
pub mod transport;
pub mod types;

pub use api::{TelegramApi, TelegramError};
pub use dispatch::UpdateDispatcher;
pub use transport::TelegramTransport;

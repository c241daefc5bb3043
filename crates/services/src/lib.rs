#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod messages;
pub mod registration;
pub mod registry;
pub mod report;
pub mod transport;

pub use quiz_core::Clock;

pub use engine::TestEngine;
pub use error::{EngineError, RegistrationError};
pub use registration::{RedeemOutcome, RegistrationService};
pub use registry::{Generation, SessionRegistry};
pub use transport::{Button, Callback, ChatTransport, Keyboard, TransportError};

mod ids;
mod session;
mod task;

pub use ids::{TaskId, UserId};
pub use session::{Expecting, MissedTask, Session};
pub use task::{Task, TaskKind};

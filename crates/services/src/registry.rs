//! Live-session registry: the single source of truth for "is a test in
//! progress" per user.

use std::collections::HashMap;

use quiz_core::model::{Session, UserId};

/// Monotonic counter stamped on each inserted session.
///
/// A deferred timer holds the generation of the session it was started
/// for; at fire-time a mismatch means that session is gone (possibly
/// replaced by a newer one for the same user) and the fire is stale.
pub type Generation = u64;

/// Mapping from user identity to that user's active session.
///
/// At most one session per user: inserting while one is active discards
/// the old one. The caller (the engine) wraps this in a mutex and keeps
/// every state transition inside one lock acquisition, which is what makes
/// timer/event races resolve to "first remover wins".
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<UserId, SessionEntry>,
    next_generation: Generation,
}

#[derive(Debug)]
pub struct SessionEntry {
    pub generation: Generation,
    pub session: Session,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for its owner, replacing any previous one, and
    /// return the generation stamped on it.
    pub fn insert(&mut self, session: Session) -> Generation {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.sessions.insert(
            session.owner(),
            SessionEntry {
                generation,
                session,
            },
        );
        generation
    }

    #[must_use]
    pub fn get_mut(&mut self, user: UserId) -> Option<&mut SessionEntry> {
        self.sessions.get_mut(&user)
    }

    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }

    /// Remove and return the user's session, if any.
    pub fn remove(&mut self, user: UserId) -> Option<Session> {
        self.sessions.remove(&user).map(|entry| entry.session)
    }

    /// Remove the user's session only if it still carries the given
    /// generation. A mismatch (or absence) returns `None` and leaves the
    /// registry untouched; this is how a stale timer fire becomes a no-op.
    pub fn remove_if_generation(&mut self, user: UserId, generation: Generation) -> Option<Session> {
        match self.sessions.get(&user) {
            Some(entry) if entry.generation == generation => self.remove(user),
            _ => None,
        }
    }
}

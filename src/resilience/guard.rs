use crate::core::types::Session;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// A session handed out by the guard, tagged with the generation it was
/// stored under.
#[derive(Debug, Clone)]
pub struct SessionLease {
    session: Arc<Session>,
    generation: u64,
}

impl SessionLease {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct GuardState {
    current: Option<SessionLease>,
    next_generation: u64,
}

/// Single owner of the exchange session.
///
/// Reads are concurrent. Every transition goes through `set_live`,
/// `invalidate` or `clear`, serialized by the lock. `invalidate` only drops
/// the session its lease was issued for, so a late failure on an old session
/// cannot erase a newer one.
#[derive(Debug, Default)]
pub struct ConnectionGuard {
    state: RwLock<GuardState>,
}

impl ConnectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a session is present
    pub fn ensure_connected(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .is_some()
    }

    /// The live session, if any
    pub fn current(&self) -> Option<SessionLease> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Store a freshly connected session, replacing any previous one
    pub fn set_live(&self, session: Session) -> SessionLease {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.next_generation += 1;
        let lease = SessionLease {
            session: Arc::new(session),
            generation: state.next_generation,
        };
        info!(
            session_id = %lease.session.id,
            exchange = %lease.session.exchange,
            generation = lease.generation,
            "Session established"
        );
        state.current = Some(lease.clone());
        lease
    }

    /// Drop the session `lease` refers to. Returns false when it was already
    /// gone or has been replaced.
    pub fn invalidate(&self, lease: &SessionLease) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match &state.current {
            Some(current) if current.generation == lease.generation => {
                state.current = None;
                true
            }
            _ => {
                debug!(
                    generation = lease.generation,
                    "Ignoring invalidation of stale session"
                );
                false
            }
        }
    }

    /// Unconditionally drop the current session
    pub fn clear(&self) -> Option<SessionLease> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .take()
    }
}

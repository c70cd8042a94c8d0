use crate::bot::action_codec::AdminOp;
use crate::models::{ItemKind, SectionId, UserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// What an administrator is in the middle of doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// The next text message names a new section under `parent_id` (top level when `None`).
    AwaitingSectionName { parent_id: Option<SectionId> },
    AwaitingRename { section_id: SectionId },
    /// A section id must be supplied before `for_action` can run.
    AwaitingSectionPick { for_action: AdminOp },
    /// The next message becomes an item of `section_id`; `kind: None` accepts any kind.
    AwaitingItemContent {
        section_id: SectionId,
        kind: Option<ItemKind>,
    },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

/// Process-lifetime store of per-administrator session state.
///
/// Absent entries read as `Idle`; storing `Idle` removes the entry. A single
/// lock covers the whole map so that `update` is a read-then-write no other
/// update can interleave with.
#[derive(Debug, Default)]
pub struct AdminSessions {
    states: Mutex<HashMap<UserId, SessionState>>,
}

impl AdminSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, SessionState>> {
        self.states.lock().unwrap_or_else(|poisoned| {
            log::error!("Mutex for admin sessions was poisoned! Recovering lock.");
            poisoned.into_inner()
        })
    }

    fn store(states: &mut HashMap<UserId, SessionState>, admin: UserId, state: SessionState) {
        if state.is_idle() {
            states.remove(&admin);
        } else {
            states.insert(admin, state);
        }
    }

    pub fn get(&self, admin: UserId) -> SessionState {
        self.lock().get(&admin).copied().unwrap_or_default()
    }

    pub fn set(&self, admin: UserId, state: SessionState) {
        Self::store(&mut self.lock(), admin, state);
    }

    pub fn clear(&self, admin: UserId) {
        self.set(admin, SessionState::Idle);
    }

    /// Runs `f` on the current state and stores the state it returns, holding
    /// the lock for the whole call.
    pub fn update<R>(&self, admin: UserId, f: impl FnOnce(SessionState) -> (SessionState, R)) -> R {
        let mut states = self.lock();
        let current = states.get(&admin).copied().unwrap_or_default();
        let (next, result) = f(current);
        if next != current {
            log::debug!("Admin {} session: {:?} -> {:?}", admin, current, next);
        }
        Self::store(&mut states, admin, next);
        result
    }
}

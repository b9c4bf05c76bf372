//! Account lockout state machine
//!
//! `Active(0) -> Active(k) -> Locked`. The store enforces the transitions with
//! guarded updates; this module decides what a freshly read state means.

use crate::models::LockState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Active { quota: i32 },
    Locked,
}

impl LockoutState {
    /// `locked` is checked before the counter
    pub fn of(state: &LockState, max_attempts: i32) -> Self {
        if state.locked || state.quota >= max_attempts {
            LockoutState::Locked
        } else {
            LockoutState::Active { quota: state.quota }
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockoutState::Locked)
    }
}

/// What a failed attempt leads to, given the state re-read after the
/// guarded increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still active; `remaining` attempts before lock
    Counted { quota: i32, remaining: i32 },
    /// Counter reached the threshold and the lock flag must be set
    ReachedThreshold,
    /// Another request already locked the account
    AlreadyLocked,
}

pub fn after_failure(state: &LockState, max_attempts: i32) -> FailureOutcome {
    if state.locked {
        FailureOutcome::AlreadyLocked
    } else if state.quota >= max_attempts {
        FailureOutcome::ReachedThreshold
    } else {
        FailureOutcome::Counted {
            quota: state.quota,
            remaining: max_attempts - state.quota,
        }
    }
}

/// Does a successful authentication need to clear the counter?
pub fn needs_reset(state: &LockState) -> bool {
    !state.locked && state.quota > 0
}

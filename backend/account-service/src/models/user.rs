use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account record.
///
/// `pin`, `quota` and `locked` on a cached copy are advisory. Before a cached
/// copy is trusted for a login, the store's [`CredentialState`] is read and a
/// hash mismatch discards the cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub pin: String,
    pub device_token: String,
    pub quota: i32,
    pub locked: bool,
    pub is_active: bool,
    pub premium: bool,
    pub face_id: bool,
    pub finger_print: bool,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn lock_state(&self) -> LockState {
        LockState {
            user_id: self.id,
            quota: self.quota,
            locked: self.locked,
        }
    }

    /// Replace the lockout fields with the store's view
    pub fn apply_lock_state(&mut self, state: &LockState) {
        self.quota = state.quota;
        self.locked = state.locked;
    }
}

/// Lockout columns of an active user, read through the lookup index
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct LockState {
    #[sqlx(rename = "id")]
    pub user_id: Uuid,
    pub quota: i32,
    pub locked: bool,
}

/// Lockout columns plus the current PIN hash of an active user.
///
/// One narrow read that decides whether a cached [`User`] is still usable
/// for authentication.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CredentialState {
    #[sqlx(rename = "id")]
    pub user_id: Uuid,
    pub pin: String,
    pub quota: i32,
    pub locked: bool,
}

impl CredentialState {
    pub fn lock_state(&self) -> LockState {
        LockState {
            user_id: self.user_id,
            quota: self.quota,
            locked: self.locked,
        }
    }

    /// Does `user` still hold this account's current secret?
    pub fn matches(&self, user: &User) -> bool {
        self.user_id == user.id && self.pin == user.pin
    }
}

/// Fields for a user created at registration
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub pin_hash: String,
    pub device_token: String,
}

/// Optional fields for profile updates; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
    pub face_id: Option<bool>,
    pub finger_print: Option<bool>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == ProfileChanges::default()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(photo) = &self.photo {
            user.photo = Some(photo.clone());
        }
        if let Some(face_id) = self.face_id {
            user.face_id = face_id;
        }
        if let Some(finger_print) = self.finger_print {
            user.finger_print = finger_print;
        }
    }
}

//! Credential store seam
//!
//! `CredentialStore` is the only owner of durable account state. Services talk
//! to it through `Arc<dyn CredentialStore>`; production wires in
//! `PgCredentialStore`, tests wire in fakes or mocks.

use crate::db;
use crate::error::Result;
use crate::models::{CredentialState, LockState, NewOtp, NewUser, Otp, ProfileChanges, User, Wallet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active user for `phone`
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;

    /// Active wallet of the active user for `phone`
    async fn find_wallet_by_phone(&self, phone: &str) -> Result<Option<Wallet>>;

    /// Authoritative lockout columns for an active user
    async fn find_lock_state(&self, phone: &str) -> Result<Option<LockState>>;

    /// Lockout columns plus current PIN hash, to vet a cached user
    async fn find_credential_state(&self, phone: &str) -> Result<Option<CredentialState>>;

    async fn phone_exists(&self, phone: &str) -> Result<bool>;

    /// Insert user and wallet atomically
    async fn create_account(&self, new_user: &NewUser, currency: &str) -> Result<(User, Wallet)>;

    /// Guarded `quota + 1`; `false` when the guard matched nothing
    async fn increment_failed_attempts(&self, phone: &str, max_attempts: i32) -> Result<bool>;

    /// Lock user and wallet; `true` only for the call that performed the lock
    async fn lock_account(&self, user_id: Uuid, max_attempts: i32) -> Result<bool>;

    async fn reset_failed_attempts(&self, phone: &str) -> Result<bool>;

    async fn update_device_token(&self, phone: &str, device_token: &str) -> Result<bool>;

    /// Secret change on a clean account only
    async fn update_secret(&self, phone: &str, pin_hash: &str) -> Result<bool>;

    /// OTP-gated reset: new secret, quota cleared, user and wallet unlocked
    async fn reset_secret(&self, phone: &str, pin_hash: &str) -> Result<bool>;

    async fn update_profile(&self, phone: &str, changes: &ProfileChanges) -> Result<Option<User>>;

    /// Soft-delete user and wallet atomically
    async fn deactivate_account(&self, user_id: Uuid, max_attempts: i32) -> Result<bool>;

    async fn insert_otp(&self, otp: &NewOtp) -> Result<Otp>;

    async fn find_otp(&self, key_uid: Uuid) -> Result<Option<Otp>>;

    /// Guarded `is_used = true`; `false` when already used or expired at `now`
    async fn consume_otp(&self, otp_id: Uuid, now: DateTime<Utc>) -> Result<bool>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        db::users::find_active_by_phone(&self.pool, phone).await
    }

    async fn find_wallet_by_phone(&self, phone: &str) -> Result<Option<Wallet>> {
        db::wallets::find_active_by_phone(&self.pool, phone).await
    }

    async fn find_lock_state(&self, phone: &str) -> Result<Option<LockState>> {
        db::users::find_lock_state(&self.pool, phone).await
    }

    async fn find_credential_state(&self, phone: &str) -> Result<Option<CredentialState>> {
        db::users::find_credential_state(&self.pool, phone).await
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool> {
        db::users::phone_exists(&self.pool, phone).await
    }

    async fn create_account(&self, new_user: &NewUser, currency: &str) -> Result<(User, Wallet)> {
        db::users::create_with_wallet(&self.pool, new_user, currency).await
    }

    async fn increment_failed_attempts(&self, phone: &str, max_attempts: i32) -> Result<bool> {
        db::users::increment_quota(&self.pool, phone, max_attempts).await
    }

    async fn lock_account(&self, user_id: Uuid, max_attempts: i32) -> Result<bool> {
        db::users::lock(&self.pool, user_id, max_attempts).await
    }

    async fn reset_failed_attempts(&self, phone: &str) -> Result<bool> {
        db::users::reset_quota(&self.pool, phone).await
    }

    async fn update_device_token(&self, phone: &str, device_token: &str) -> Result<bool> {
        db::users::update_device_token(&self.pool, phone, device_token).await
    }

    async fn update_secret(&self, phone: &str, pin_hash: &str) -> Result<bool> {
        db::users::update_pin(&self.pool, phone, pin_hash).await
    }

    async fn reset_secret(&self, phone: &str, pin_hash: &str) -> Result<bool> {
        db::users::reset_pin(&self.pool, phone, pin_hash).await
    }

    async fn update_profile(&self, phone: &str, changes: &ProfileChanges) -> Result<Option<User>> {
        db::users::update_profile(&self.pool, phone, changes).await
    }

    async fn deactivate_account(&self, user_id: Uuid, max_attempts: i32) -> Result<bool> {
        db::users::deactivate(&self.pool, user_id, max_attempts).await
    }

    async fn insert_otp(&self, otp: &NewOtp) -> Result<Otp> {
        db::otps::insert(&self.pool, otp).await
    }

    async fn find_otp(&self, key_uid: Uuid) -> Result<Option<Otp>> {
        db::otps::find_by_key_uid(&self.pool, key_uid).await
    }

    async fn consume_otp(&self, otp_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        db::otps::mark_used(&self.pool, otp_id, now).await
    }
}

//! Shared fakes for integration tests
//!
//! `FakeStore` applies the same guards as the SQL in `db::*`, so lockout and
//! OTP races behave as they would against Postgres.

#![allow(dead_code)]

use account_service::config::{AuthSettings, JwtSettings};
use account_service::models::{
    CredentialState, LockState, NewOtp, NewUser, Otp, OtpTuple, ProfileChanges, User, Wallet,
};
use account_service::security::{SecretHasher, TokenIssuer};
use account_service::services::{AccountDeps, AccountService, Clock, SmsSender};
use account_service::{AccountError, CredentialStore, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kv_cache::{CacheError, CacheResult, KvCache, MemoryCache};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const PHONE: &str = "+221770000000";
pub const PIN: &str = "4821";
pub const WRONG_PIN: &str = "0000";
pub const DEVICE: &str = "device-token-0001";
pub const MAX_ATTEMPTS: i32 = 3;

// ============ Store ============

#[derive(Default)]
struct StoreState {
    users: Vec<User>,
    wallets: Vec<Wallet>,
    otps: Vec<Otp>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
    read_delay: Mutex<Option<Duration>>,
    pub user_reads: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Insert an active user with its wallet
    pub fn seed_account(&self, phone: &str, pin_hash: &str) -> (User, Wallet) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Awa".to_string(),
            last_name: "Diop".to_string(),
            phone_number: phone.to_string(),
            pin: pin_hash.to_string(),
            device_token: DEVICE.to_string(),
            quota: 0,
            locked: false,
            is_active: true,
            premium: false,
            face_id: false,
            finger_print: false,
            photo: None,
            created_at: now,
            updated_at: now,
        };
        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id: user.id,
            balance: 0,
            currency: "XOF".to_string(),
            locked: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock().unwrap();
        state.users.push(user.clone());
        state.wallets.push(wallet.clone());
        (user, wallet)
    }

    /// Latest row for `phone`, active or not
    pub fn user(&self, phone: &str) -> Option<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .rev()
            .find(|u| u.phone_number == phone)
            .cloned()
    }

    pub fn wallet_of(&self, user_id: Uuid) -> Option<Wallet> {
        let state = self.state.lock().unwrap();
        state.wallets.iter().find(|w| w.user_id == user_id).cloned()
    }

    pub fn otp(&self, key_uid: Uuid) -> Option<Otp> {
        let state = self.state.lock().unwrap();
        state.otps.iter().find(|o| o.key_uid == key_uid).cloned()
    }

    pub fn set_lock_columns(&self, phone: &str, quota: i32, locked: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state
            .users
            .iter_mut()
            .find(|u| u.phone_number == phone && u.is_active)
        {
            user.quota = quota;
            user.locked = locked;
        }
    }

    fn with_active_user<T>(&self, phone: &str, f: impl FnOnce(&mut User) -> T) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        state
            .users
            .iter_mut()
            .find(|u| u.phone_number == phone && u.is_active)
            .map(f)
    }

    fn set_wallet_locked(state: &mut StoreState, user_id: Uuid, locked: bool) {
        for wallet in state
            .wallets
            .iter_mut()
            .filter(|w| w.user_id == user_id && w.is_active)
        {
            wallet.locked = locked;
        }
    }
}

#[async_trait]
impl CredentialStore for FakeStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.with_active_user(phone, |u| u.clone()))
    }

    async fn find_wallet_by_phone(&self, phone: &str) -> Result<Option<Wallet>> {
        self.pause().await;
        let state = self.state.lock().unwrap();
        let Some(user) = state
            .users
            .iter()
            .find(|u| u.phone_number == phone && u.is_active)
        else {
            return Ok(None);
        };
        Ok(state
            .wallets
            .iter()
            .find(|w| w.user_id == user.id && w.is_active)
            .cloned())
    }

    async fn find_lock_state(&self, phone: &str) -> Result<Option<LockState>> {
        Ok(self.with_active_user(phone, |u| u.lock_state()))
    }

    async fn find_credential_state(&self, phone: &str) -> Result<Option<CredentialState>> {
        Ok(self.with_active_user(phone, |u| CredentialState {
            user_id: u.id,
            pin: u.pin.clone(),
            quota: u.quota,
            locked: u.locked,
        }))
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool> {
        Ok(self.with_active_user(phone, |_| ()).is_some())
    }

    async fn create_account(&self, new_user: &NewUser, currency: &str) -> Result<(User, Wallet)> {
        if self.phone_exists(&new_user.phone_number).await? {
            return Err(AccountError::AlreadyRegistered);
        }
        let (mut user, mut wallet) = self.seed_account(&new_user.phone_number, &new_user.pin_hash);

        let mut state = self.state.lock().unwrap();
        let stored = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .expect("seeded user");
        stored.first_name = new_user.first_name.clone();
        stored.last_name = new_user.last_name.clone();
        stored.device_token = new_user.device_token.clone();
        user = stored.clone();

        let stored_wallet = state
            .wallets
            .iter_mut()
            .find(|w| w.id == wallet.id)
            .expect("seeded wallet");
        stored_wallet.currency = currency.to_string();
        wallet = stored_wallet.clone();

        Ok((user, wallet))
    }

    async fn increment_failed_attempts(&self, phone: &str, max_attempts: i32) -> Result<bool> {
        Ok(self
            .with_active_user(phone, |u| {
                if !u.locked && u.quota < max_attempts {
                    u.quota += 1;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false))
    }

    async fn lock_account(&self, user_id: Uuid, max_attempts: i32) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(user) = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.is_active && !u.locked && u.quota >= max_attempts)
        else {
            return Ok(false);
        };
        user.locked = true;
        Self::set_wallet_locked(&mut state, user_id, true);
        Ok(true)
    }

    async fn reset_failed_attempts(&self, phone: &str) -> Result<bool> {
        Ok(self
            .with_active_user(phone, |u| {
                if u.locked {
                    return false;
                }
                u.quota = 0;
                true
            })
            .unwrap_or(false))
    }

    async fn update_device_token(&self, phone: &str, device_token: &str) -> Result<bool> {
        Ok(self
            .with_active_user(phone, |u| u.device_token = device_token.to_string())
            .is_some())
    }

    async fn update_secret(&self, phone: &str, pin_hash: &str) -> Result<bool> {
        Ok(self
            .with_active_user(phone, |u| {
                if u.locked || u.quota != 0 {
                    return false;
                }
                u.pin = pin_hash.to_string();
                true
            })
            .unwrap_or(false))
    }

    async fn reset_secret(&self, phone: &str, pin_hash: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(user) = state
            .users
            .iter_mut()
            .find(|u| u.phone_number == phone && u.is_active)
        else {
            return Ok(false);
        };
        user.pin = pin_hash.to_string();
        user.quota = 0;
        user.locked = false;
        let user_id = user.id;
        Self::set_wallet_locked(&mut state, user_id, false);
        Ok(true)
    }

    async fn update_profile(&self, phone: &str, changes: &ProfileChanges) -> Result<Option<User>> {
        Ok(self.with_active_user(phone, |u| {
            changes.apply_to(u);
            u.clone()
        }))
    }

    async fn deactivate_account(&self, user_id: Uuid, max_attempts: i32) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(user) = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.is_active)
        else {
            return Ok(false);
        };
        user.is_active = false;
        user.locked = true;
        user.quota = max_attempts;
        for wallet in state.wallets.iter_mut().filter(|w| w.user_id == user_id) {
            wallet.is_active = false;
            wallet.locked = true;
        }
        Ok(true)
    }

    async fn insert_otp(&self, otp: &NewOtp) -> Result<Otp> {
        let now = Utc::now();
        let record = Otp {
            id: Uuid::new_v4(),
            code: otp.code.clone(),
            phone_number: otp.phone_number.clone(),
            key_uid: otp.key_uid,
            is_used: false,
            expiry_at: otp.expiry_at,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().otps.push(record.clone());
        Ok(record)
    }

    async fn find_otp(&self, key_uid: Uuid) -> Result<Option<Otp>> {
        self.pause().await;
        Ok(self.otp(key_uid))
    }

    async fn consume_otp(&self, otp_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(otp) = state
            .otps
            .iter_mut()
            .find(|o| o.id == otp_id && !o.is_used && o.expiry_at > now)
        else {
            return Ok(false);
        };
        otp.is_used = true;
        otp.updated_at = now;
        Ok(true)
    }
}

// ============ SMS ============

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSms {
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_containing(&self, needle: &str) -> usize {
        self.sent()
            .iter()
            .filter(|(_, message)| message.contains(needle))
            .count()
    }

    /// Digits of the last OTP message sent to `phone`
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|(to, message)| to == phone && message.starts_with("Your verification code"))
            .and_then(|(_, message)| {
                message
                    .split_whitespace()
                    .find(|word| word.trim_end_matches('.').chars().all(|c| c.is_ascii_digit()))
                    .map(|word| word.trim_end_matches('.').to_string())
            })
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> anyhow::Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

// ============ Hasher ============

/// Reversible stand-in for Argon2 that counts calls
#[derive(Default)]
pub struct CountingHasher {
    pub hashes: AtomicUsize,
    pub verifies: AtomicUsize,
}

impl CountingHasher {
    pub fn encode(pin: &str) -> String {
        format!("plain${}", pin)
    }

    pub fn verify_calls(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }
}

impl SecretHasher for CountingHasher {
    fn hash(&self, secret: &str) -> Result<String> {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        Ok(Self::encode(secret))
    }

    fn verify(&self, secret: &str, encoded: &str) -> Result<bool> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        Ok(encoded == Self::encode(secret))
    }
}

// ============ Clock ============

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============ Cache ============

/// Cache whose every operation fails
pub struct BrokenCache;

#[async_trait]
impl KvCache for BrokenCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Timeout)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> CacheResult<()> {
        Err(CacheError::Timeout)
    }

    async fn set_many(
        &self,
        _items: Vec<(String, String)>,
        _ttl: Option<Duration>,
    ) -> CacheResult<()> {
        Err(CacheError::Timeout)
    }

    async fn del(&self, _keys: &[String]) -> CacheResult<()> {
        Err(CacheError::Timeout)
    }
}

/// Memory cache whose writes can be made to fail on demand. Reads and deletes
/// always go through.
pub struct SwitchableCache {
    inner: Arc<MemoryCache>,
    fail_writes: AtomicBool,
    set_calls: AtomicUsize,
}

impl SwitchableCache {
    pub fn new(inner: Arc<MemoryCache>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            set_calls: AtomicUsize::new(0),
        }
    }

    /// `set` and `set_many` calls so far, failed ones included
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> CacheResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CacheError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvCache for SwitchableCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_many(
        &self,
        items: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.set_many(items, ttl).await
    }

    async fn del(&self, keys: &[String]) -> CacheResult<()> {
        self.check_write()?;
        self.inner.del(keys).await
    }
}

// ============ Harness ============

pub fn test_policy() -> AuthSettings {
    AuthSettings {
        max_login_attempts: MAX_ATTEMPTS,
        otp_length: 5,
        otp_ttl_secs: 120,
        request_timeout_secs: 5,
        side_effect_timeout_secs: 3,
        cache_ttl_secs: 86_400,
        default_currency: "XOF".to_string(),
    }
}

pub fn test_tokens() -> TokenIssuer {
    TokenIssuer::new(&JwtSettings {
        secret: "integration-test-secret-0123456789".to_string(),
        expiry_seconds: 1800,
        issuer: "account-service".to_string(),
    })
}

pub struct TestApp {
    pub service: AccountService,
    pub store: Arc<FakeStore>,
    pub cache: Arc<MemoryCache>,
    pub writes: Arc<SwitchableCache>,
    pub sms: Arc<RecordingSms>,
    pub hasher: Arc<CountingHasher>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(test_policy())
    }

    pub fn with_policy(policy: AuthSettings) -> Self {
        Self::build(policy, false)
    }

    /// Service wired to a cache that always fails
    pub fn with_broken_cache() -> Self {
        Self::build(test_policy(), true)
    }

    fn build(policy: AuthSettings, broken_cache: bool) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let writes = Arc::new(SwitchableCache::new(cache.clone()));
        let kv: Arc<dyn KvCache> = if broken_cache {
            Arc::new(BrokenCache)
        } else {
            writes.clone()
        };

        let store = Arc::new(FakeStore::new());
        let sms = Arc::new(RecordingSms::default());
        let hasher = Arc::new(CountingHasher::default());
        let clock = Arc::new(ManualClock::new());

        let service = AccountService::new(
            AccountDeps {
                store: store.clone(),
                cache: kv,
                sms: sms.clone(),
                hasher: hasher.clone(),
                clock: clock.clone(),
                tokens: test_tokens(),
            },
            policy,
        );

        Self {
            service,
            store,
            cache,
            writes,
            sms,
            hasher,
            clock,
        }
    }

    /// Seed the default account with `PIN`
    pub fn seed(&self) -> (User, Wallet) {
        self.store
            .seed_account(PHONE, &CountingHasher::encode(PIN))
    }

    /// Issue an OTP and read the code back from the recorded SMS
    pub async fn issue_otp(&self, phone: &str) -> OtpTuple {
        let issued = self.service.new_otp(phone).await.unwrap();
        self.settle().await;
        let code = self.sms.last_code_for(phone).expect("OTP SMS recorded");
        OtpTuple::new(phone, code, issued.key_uid)
    }

    /// Wait for detached side effects
    pub async fn settle(&self) {
        self.service.tasks().wait_idle().await;
    }

    pub fn lock_columns(&self) -> (i32, bool) {
        let user = self.store.user(PHONE).expect("seeded user");
        (user.quota, user.locked)
    }
}

use super::clock::Clock;
use super::fetch::{self, Deadline, Source};
use super::lockout::LockoutState;
use super::notifications::{Notifier, SmsSender};
use super::otp::OtpManager;
use super::tasks::BackgroundTasks;
use crate::cache::AccountCache;
use crate::config::AuthSettings;
use crate::error::{AccountError, Result};
use crate::models::{
    AccountSummary, AuthResult, NewUser, OtpTuple, ProfileChanges, User, UserSummary, Wallet,
};
use crate::security::{Claims, SecretHasher, TokenIssuer};
use crate::store::CredentialStore;
use crate::validators::mask_phone;
use chrono::Utc;
use kv_cache::KvCache;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Collaborators handed to `AccountService` by the composition root
pub struct AccountDeps {
    pub store: Arc<dyn CredentialStore>,
    pub cache: Arc<dyn KvCache>,
    pub sms: Arc<dyn SmsSender>,
    pub hasher: Arc<dyn SecretHasher>,
    pub clock: Arc<dyn Clock>,
    pub tokens: TokenIssuer,
}

/// Account flows. Cheap to clone; all state lives behind the store and cache.
#[derive(Clone)]
pub struct AccountService {
    pub(super) store: Arc<dyn CredentialStore>,
    pub(super) cache: AccountCache,
    pub(super) otp: OtpManager,
    pub(super) notifier: Notifier,
    pub(super) tasks: BackgroundTasks,
    pub(super) hasher: Arc<dyn SecretHasher>,
    pub(super) tokens: TokenIssuer,
    pub(super) policy: AuthSettings,
}

impl AccountService {
    pub fn new(deps: AccountDeps, policy: AuthSettings) -> Self {
        let tasks = BackgroundTasks::new(policy.side_effect_timeout());
        let otp = OtpManager::new(
            deps.store.clone(),
            deps.clock,
            policy.otp_length,
            policy.otp_ttl(),
        );

        Self {
            cache: AccountCache::new(deps.cache, policy.cache_ttl()),
            notifier: Notifier::new(deps.sms, tasks.clone()),
            store: deps.store,
            otp,
            tasks,
            hasher: deps.hasher,
            tokens: deps.tokens,
            policy,
        }
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub(super) fn deadline(&self) -> Deadline {
        Deadline::after(self.policy.request_timeout())
    }

    pub(super) fn max_attempts(&self) -> i32 {
        self.policy.max_login_attempts
    }

    pub(super) fn is_locked(&self, user: &User) -> bool {
        LockoutState::of(&user.lock_state(), self.max_attempts()).is_locked()
    }

    pub(super) async fn hash_pin(&self, pin: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let pin = pin.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&pin)).await?
    }

    pub(super) async fn verify_pin(&self, pin: &str, encoded: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let pin = pin.to_string();
        let encoded = encoded.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&pin, &encoded)).await?
    }

    pub(super) fn issue_session(&self, user: &User, wallet: &Wallet) -> Result<AuthResult> {
        Ok(AuthResult {
            token: self.tokens.issue(user.id, &user.phone_number)?,
            expires_in: self.tokens.ttl_secs(),
            user: user.into(),
            wallet: wallet.into(),
        })
    }

    pub(super) fn cache_account_in_background(&self, user: User, wallet: Wallet) {
        let cache = self.cache.clone();
        self.tasks.spawn("cache_account", async move {
            cache.put_account(&user, &wallet).await
        });
    }

    /// Re-read from the store and overwrite (or drop) the cached copy
    pub(super) fn refresh_cache_in_background(&self, phone: &str) {
        let cache = self.cache.clone();
        let store = self.store.clone();
        let phone = phone.to_string();
        self.tasks.spawn("cache_refresh", async move {
            let (user, wallet) = tokio::join!(
                store.find_user_by_phone(&phone),
                store.find_wallet_by_phone(&phone),
            );
            match (user?, wallet?) {
                (Some(user), Some(wallet)) => cache.put_account(&user, &wallet).await,
                _ => cache.evict(&phone).await,
            }
        });
    }

    pub(super) fn evict_cache_in_background(&self, phone: &str) {
        let cache = self.cache.clone();
        let phone = phone.to_string();
        self.tasks
            .spawn("cache_evict", async move { cache.evict(&phone).await });
    }

    /// Create user and wallet, then open a session
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        phone: &str,
        pin: &str,
        device_token: &str,
    ) -> Result<AuthResult> {
        let deadline = self.deadline();

        if deadline.run(self.store.phone_exists(phone)).await? {
            warn!(phone = %mask_phone(phone), "Registration for existing phone number");
            return Err(AccountError::AlreadyRegistered);
        }

        let new_user = NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone_number: phone.to_string(),
            pin_hash: deadline.run(self.hash_pin(pin)).await?,
            device_token: device_token.to_string(),
        };

        let (user, wallet) = deadline
            .run(
                self.store
                    .create_account(&new_user, &self.policy.default_currency),
            )
            .await?;

        let session = self.issue_session(&user, &wallet)?;
        self.cache_account_in_background(user.clone(), wallet);

        info!(target: "audit", user_id = %user.id, phone = %mask_phone(phone), "Account registered");
        Ok(session)
    }

    /// Read-through lookup; store hits are written back to the cache
    pub async fn get_user(&self, phone: &str) -> Result<AccountSummary> {
        let deadline = self.deadline();
        let snapshot =
            fetch::read_through(&self.cache, self.store.as_ref(), phone, &deadline).await?;

        let summary = AccountSummary::new(&snapshot.user, &snapshot.wallet);
        if snapshot.source == Source::Store {
            self.cache_account_in_background(snapshot.user, snapshot.wallet);
        }
        Ok(summary)
    }

    pub async fn update_profile(&self, phone: &str, changes: &ProfileChanges) -> Result<UserSummary> {
        if changes.is_empty() {
            return Err(AccountError::Validation(
                "at least one profile field is required".to_string(),
            ));
        }

        let deadline = self.deadline();
        let user = deadline
            .run(self.store.update_profile(phone, changes))
            .await?
            .ok_or(AccountError::UserNotFound)?;

        self.refresh_cache_in_background(phone);
        info!(target: "audit", user_id = %user.id, phone = %mask_phone(phone), "Profile updated");
        Ok(UserSummary::from(&user))
    }

    /// End a session: its token is refused from now until it expires, and the
    /// cached account is dropped.
    pub async fn sign_out(&self, claims: &Claims) -> Result<()> {
        let lifetime = claims.remaining_lifetime(Utc::now().timestamp());
        self.cache
            .revoke_token(&claims.jti, lifetime)
            .await
            .map_err(|e| AccountError::Internal(format!("token revocation failed: {}", e)))?;

        self.evict_cache_in_background(&claims.phone);
        info!(
            target: "audit",
            user_id = %claims.sub,
            phone = %mask_phone(&claims.phone),
            "Signed out"
        );
        Ok(())
    }

    pub async fn is_session_revoked(&self, claims: &Claims) -> bool {
        self.cache.is_token_revoked(&claims.jti).await
    }

    /// PIN + OTP gated soft-delete of user and wallet.
    ///
    /// # Security
    ///
    /// Both factors are checked before anything is mutated. A wrong PIN counts
    /// toward lockout and leaves the OTP usable; the OTP is consumed before
    /// the account is deactivated.
    pub async fn remove_account(&self, presented: &OtpTuple, pin: &str) -> Result<()> {
        let phone = presented.phone_number.as_str();
        let deadline = self.deadline();
        let now = self.otp.now();

        let (user, otp) =
            fetch::fetch_user_and_otp(self.store.as_ref(), presented, now, &deadline).await?;

        if self.is_locked(&user) {
            warn!(phone = %mask_phone(phone), "Account removal on locked account");
            return Err(AccountError::AccountLocked);
        }
        if !deadline.run(self.verify_pin(pin, &user.pin)).await? {
            return Err(self.record_failed_attempt(&user, &deadline).await);
        }

        self.otp.consume(&otp, now, &deadline).await?;

        let deactivated = deadline
            .run(self.store.deactivate_account(user.id, self.max_attempts()))
            .await?;
        if !deactivated {
            error!(
                user_id = %user.id,
                phone = %mask_phone(phone),
                "OTP consumed but account was already inactive"
            );
            return Err(AccountError::UserNotFound);
        }

        self.evict_cache_in_background(phone);
        info!(target: "audit", user_id = %user.id, phone = %mask_phone(phone), "Account removed");
        Ok(())
    }
}

use super::account::AccountService;
use super::fetch::{self, AccountSnapshot, Deadline, Source};
use super::lockout::{self, FailureOutcome};
use crate::error::{AccountError, Result};
use crate::models::{AuthResult, User, Wallet};
use crate::validators::mask_phone;
use tracing::{info, warn};

impl AccountService {
    /// PIN login with lockout.
    ///
    /// # Security
    ///
    /// - A cached user is only trusted after the store confirms its id and
    ///   PIN hash; on mismatch the cached copy is dropped and the store's
    ///   account is used instead. A PIN change that never reached the cache
    ///   cannot keep the old PIN alive.
    /// - The lock decision always uses the store's lock columns, and a locked
    ///   account is refused before the PIN is looked at.
    /// - Unknown phone numbers fail exactly like a wrong PIN.
    pub async fn login(&self, phone: &str, pin: &str, device_token: &str) -> Result<AuthResult> {
        let deadline = self.deadline();

        let snapshot = match self.authoritative_snapshot(phone, &deadline).await {
            Ok(snapshot) => snapshot,
            Err(AccountError::UserNotFound) => {
                warn!(phone = %mask_phone(phone), "Login for unknown phone number");
                return Err(AccountError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };
        let AccountSnapshot {
            user,
            wallet,
            source,
        } = snapshot;

        if self.is_locked(&user) {
            warn!(phone = %mask_phone(phone), "Login attempt on locked account");
            return Err(AccountError::AccountLocked);
        }

        if !deadline.run(self.verify_pin(pin, &user.pin)).await? {
            return Err(self.record_failed_attempt(&user, &deadline).await);
        }

        self.complete_login(user, wallet, source, device_token, &deadline)
            .await
    }

    /// Read-through snapshot whose credential columns match the store
    async fn authoritative_snapshot(
        &self,
        phone: &str,
        deadline: &Deadline,
    ) -> Result<AccountSnapshot> {
        let mut snapshot =
            fetch::read_through(&self.cache, self.store.as_ref(), phone, deadline).await?;
        if snapshot.source == Source::Store {
            return Ok(snapshot);
        }

        let state = deadline
            .run(self.store.find_credential_state(phone))
            .await?;
        match state {
            Some(state) if state.matches(&snapshot.user) => {
                snapshot.user.apply_lock_state(&state.lock_state());
                Ok(snapshot)
            }
            Some(_) => {
                warn!(phone = %mask_phone(phone), "Cached credentials are stale");
                self.evict_cache_in_background(phone);
                let (user, wallet) =
                    fetch::fetch_user_and_wallet(self.store.as_ref(), phone, deadline).await?;
                Ok(AccountSnapshot {
                    user,
                    wallet,
                    source: Source::Store,
                })
            }
            None => {
                self.evict_cache_in_background(phone);
                Err(AccountError::UserNotFound)
            }
        }
    }

    async fn complete_login(
        &self,
        mut user: User,
        wallet: Wallet,
        source: Source,
        device_token: &str,
        deadline: &Deadline,
    ) -> Result<AuthResult> {
        let phone = user.phone_number.clone();

        if lockout::needs_reset(&user.lock_state()) {
            deadline
                .run(self.store.reset_failed_attempts(&phone))
                .await?;
            user.quota = 0;
        }

        if user.device_token != device_token {
            let store = self.store.clone();
            let cache = self.cache.clone();
            let (phone, token) = (phone.clone(), device_token.to_string());
            self.tasks.spawn("device_token_refresh", async move {
                store.update_device_token(&phone, &token).await?;
                if source == Source::Cache {
                    cache.evict(&phone).await?;
                }
                Ok(())
            });
            user.device_token = device_token.to_string();
        }

        let session = self.issue_session(&user, &wallet)?;
        // A cache hit is never written back, so its TTL is not renewed
        if source == Source::Store {
            self.cache_account_in_background(user.clone(), wallet);
        }

        info!(target: "audit", user_id = %user.id, phone = %mask_phone(&phone), "Login succeeded");
        Ok(session)
    }

    /// Failed authentication: guarded increment, re-read, lock at the
    /// threshold. Returns the error to report to the caller.
    pub(super) async fn record_failed_attempt(
        &self,
        user: &User,
        deadline: &Deadline,
    ) -> AccountError {
        let phone = user.phone_number.as_str();
        let outcome = self.apply_failure(phone, deadline).await;
        self.refresh_cache_in_background(phone);

        match outcome {
            Ok(err) | Err(err) => err,
        }
    }

    async fn apply_failure(&self, phone: &str, deadline: &Deadline) -> Result<AccountError> {
        let max_attempts = self.max_attempts();

        deadline
            .run(self.store.increment_failed_attempts(phone, max_attempts))
            .await?;
        let state = deadline
            .run(self.store.find_lock_state(phone))
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        match lockout::after_failure(&state, max_attempts) {
            FailureOutcome::Counted { quota, remaining } => {
                warn!(phone = %mask_phone(phone), quota, remaining, "Invalid PIN");
                Ok(AccountError::InvalidCredentials)
            }
            FailureOutcome::ReachedThreshold => {
                let newly_locked = deadline
                    .run(self.store.lock_account(state.user_id, max_attempts))
                    .await?;
                if newly_locked {
                    warn!(
                        target: "audit",
                        user_id = %state.user_id,
                        phone = %mask_phone(phone),
                        "Account locked after repeated PIN failures"
                    );
                    self.notifier.account_locked(phone);
                }
                Ok(AccountError::AccountLocked)
            }
            FailureOutcome::AlreadyLocked => Ok(AccountError::AccountLocked),
        }
    }
}

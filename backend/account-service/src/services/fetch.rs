//! Concurrent fetch orchestrator
//!
//! Read-through lookups (cache, then store) and parallel store lookups that
//! share one deadline. Parallel branches are joined, never raced, and when
//! both fail the user branch's error is reported.

use super::otp::OtpManager;
use crate::cache::AccountCache;
use crate::error::{AccountError, Result};
use crate::models::{Otp, OtpTuple, User, Wallet};
use crate::store::CredentialStore;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Single budget shared by every sub-fetch of one operation
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run `fut` until the shared deadline; expiry becomes `Timeout`
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(AccountError::Timeout(self.budget)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Store,
}

#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub user: User,
    pub wallet: Wallet,
    pub source: Source,
}

/// Cache first; on miss, user and wallet from the store in parallel
pub async fn read_through(
    cache: &AccountCache,
    store: &dyn CredentialStore,
    phone: &str,
    deadline: &Deadline,
) -> Result<AccountSnapshot> {
    let cached = deadline.run(async { Ok(cache.get_account(phone).await) }).await?;
    if let Some((user, wallet)) = cached {
        return Ok(AccountSnapshot {
            user,
            wallet,
            source: Source::Cache,
        });
    }

    let (user, wallet) = fetch_user_and_wallet(store, phone, deadline).await?;
    Ok(AccountSnapshot {
        user,
        wallet,
        source: Source::Store,
    })
}

pub async fn fetch_user_and_wallet(
    store: &dyn CredentialStore,
    phone: &str,
    deadline: &Deadline,
) -> Result<(User, Wallet)> {
    deadline
        .run(async {
            let (user, wallet) = tokio::join!(
                store.find_user_by_phone(phone),
                store.find_wallet_by_phone(phone),
            );
            let user = user?.ok_or(AccountError::UserNotFound)?;
            let wallet = wallet?.ok_or(AccountError::UserNotFound)?;
            Ok((user, wallet))
        })
        .await
}

/// User lookup alongside OTP lookup and tuple check. Nothing is mutated.
pub async fn fetch_user_and_otp(
    store: &dyn CredentialStore,
    presented: &OtpTuple,
    now: DateTime<Utc>,
    deadline: &Deadline,
) -> Result<(User, Otp)> {
    deadline
        .run(async {
            let user_branch = async {
                store
                    .find_user_by_phone(&presented.phone_number)
                    .await?
                    .ok_or(AccountError::UserNotFound)
            };
            let otp_branch = async {
                let record = store.find_otp(presented.key_uid).await?;
                OtpManager::check(record, presented, now).map_err(AccountError::OtpInvalid)
            };

            let (user, otp) = tokio::join!(user_branch, otp_branch);
            Ok((user?, otp?))
        })
        .await
}

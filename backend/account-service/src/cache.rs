//! Typed account cache over `kv_cache::KvCache`
//!
//! Every read failure is a miss and every write failure is logged. Nothing
//! here returns an error to a request.

use crate::models::{User, Wallet};
use crate::validators::mask_phone;
use kv_cache::{get_json, to_json, CacheKey, KvCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AccountCache {
    inner: Arc<dyn KvCache>,
    ttl: Option<Duration>,
}

impl AccountCache {
    pub fn new(inner: Arc<dyn KvCache>, ttl: Option<Duration>) -> Self {
        Self { inner, ttl }
    }

    /// Cached user and wallet, or `None` unless both are present
    pub async fn get_account(&self, phone: &str) -> Option<(User, Wallet)> {
        let user_key = CacheKey::user(phone);
        let wallet_key = CacheKey::wallet(phone);

        let (user, wallet) = tokio::join!(
            get_json::<User>(self.inner.as_ref(), &user_key),
            get_json::<Wallet>(self.inner.as_ref(), &wallet_key),
        );

        match (user, wallet) {
            (Ok(Some(user)), Ok(Some(wallet))) => Some((user, wallet)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(phone = %mask_phone(phone), error = %e, "Account cache read failed");
                None
            }
            _ => {
                debug!(phone = %mask_phone(phone), "Account cache miss");
                None
            }
        }
    }

    /// Write user and wallet in one pipelined round trip
    pub async fn put_account(&self, user: &User, wallet: &Wallet) -> anyhow::Result<()> {
        let phone = &user.phone_number;
        let items = vec![
            (CacheKey::user(phone), to_json(user)?),
            (CacheKey::wallet(phone), to_json(wallet)?),
        ];
        self.inner.set_many(items, self.ttl).await?;
        Ok(())
    }

    pub async fn evict(&self, phone: &str) -> anyhow::Result<()> {
        self.inner.del(&CacheKey::account(phone)).await?;
        Ok(())
    }

    /// Mark a session token as revoked until it would have expired anyway
    pub async fn revoke_token(&self, jti: &str, lifetime: Duration) -> anyhow::Result<()> {
        self.inner
            .set(&CacheKey::revoked_token(jti), "1".to_string(), Some(lifetime))
            .await?;
        Ok(())
    }

    /// A failed lookup reads as "not revoked"
    pub async fn is_token_revoked(&self, jti: &str) -> bool {
        match self.inner.get(&CacheKey::revoked_token(jti)).await {
            Ok(marker) => marker.is_some(),
            Err(e) => {
                warn!(error = %e, "Token revocation lookup failed");
                false
            }
        }
    }
}

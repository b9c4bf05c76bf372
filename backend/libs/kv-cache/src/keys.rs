//! Cache key scheme
//!
//! Account records are keyed by phone number, not by id, because every
//! inbound request identifies the account by its phone number.
//! Format: {entity}:{phone_number}
//!
//! Revoked session tokens are keyed by token id.
//! Format: revoked:token:{jti}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// User record
    /// Format: user:{phone_number}
    pub fn user(phone_number: &str) -> String {
        format!("user:{}", phone_number)
    }

    /// Wallet record of the user owning `phone_number`
    /// Format: wallet:{phone_number}
    pub fn wallet(phone_number: &str) -> String {
        format!("wallet:{}", phone_number)
    }

    /// Both keys of an account, user first
    pub fn account(phone_number: &str) -> [String; 2] {
        [Self::user(phone_number), Self::wallet(phone_number)]
    }

    /// Revocation marker of a session token
    /// Format: revoked:token:{jti}
    pub fn revoked_token(jti: &str) -> String {
        format!("revoked:token:{}", jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key() {
        assert_eq!(CacheKey::user("+221770000000"), "user:+221770000000");
    }

    #[test]
    fn test_account_keys_order() {
        let [user, wallet] = CacheKey::account("+221770000000");
        assert_eq!(user, "user:+221770000000");
        assert_eq!(wallet, "wallet:+221770000000");
    }

    #[test]
    fn test_revoked_token_key() {
        assert_eq!(
            CacheKey::revoked_token("5f0c6d1e"),
            "revoked:token:5f0c6d1e"
        );
    }
}

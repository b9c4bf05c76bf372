use super::{User, Wallet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user; never carries the secret or lockout counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub device_token: String,
    pub premium: bool,
    pub face_id: bool,
    pub finger_print: bool,
    pub photo: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            device_token: user.device_token.clone(),
            premium: user.premium,
            face_id: user.face_id,
            finger_print: user.finger_print,
            photo: user.photo.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub id: Uuid,
    pub balance: i64,
    pub currency: String,
}

impl From<&Wallet> for WalletSummary {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id,
            balance: wallet.balance,
            currency: wallet.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub user: UserSummary,
    pub wallet: WalletSummary,
}

impl AccountSummary {
    pub fn new(user: &User, wallet: &Wallet) -> Self {
        Self {
            user: user.into(),
            wallet: wallet.into(),
        }
    }
}

/// Result of a successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    pub token: String,
    pub expires_in: i64,
    pub user: UserSummary,
    pub wallet: WalletSummary,
}

/// Handle returned when an OTP is issued; the code itself goes out by SMS only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedOtp {
    pub key_uid: Uuid,
    pub expires_at: DateTime<Utc>,
}

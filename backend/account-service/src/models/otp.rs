use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One-time code issued to a phone number.
///
/// `is_used` only ever goes from false to true. Expiry is a predicate
/// evaluated at validation time, not a stored transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Otp {
    pub id: Uuid,
    pub code: String,
    pub phone_number: String,
    pub key_uid: Uuid,
    pub is_used: bool,
    pub expiry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Otp {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_at
    }
}

#[derive(Debug, Clone)]
pub struct NewOtp {
    pub code: String,
    pub phone_number: String,
    pub key_uid: Uuid,
    pub expiry_at: DateTime<Utc>,
}

/// The full tuple a caller must present to consume an OTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpTuple {
    pub phone_number: String,
    pub code: String,
    pub key_uid: Uuid,
}

impl OtpTuple {
    pub fn new(phone_number: impl Into<String>, code: impl Into<String>, key_uid: Uuid) -> Self {
        Self {
            phone_number: phone_number.into(),
            code: code.into(),
            key_uid,
        }
    }
}

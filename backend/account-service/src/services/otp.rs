//! OTP lifecycle: `Issued -> Consumed`, or `Issued -> Expired` by time

use super::clock::Clock;
use super::fetch::Deadline;
use crate::error::{AccountError, OtpRejection, Result};
use crate::models::{NewOtp, Otp, OtpTuple};
use crate::store::CredentialStore;
use crate::validators::mask_phone;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct OtpManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    length: usize,
    ttl: chrono::Duration,
}

impl OtpManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        length: usize,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            clock,
            length,
            ttl,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Numeric code from the OS CSPRNG. An all-zero draw is discarded.
    pub fn generate_code(length: usize) -> String {
        loop {
            let code: String = (0..length)
                .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
                .collect();
            if code.bytes().any(|b| b != b'0') {
                return code;
            }
        }
    }

    /// Persist a fresh OTP; delivery is the caller's concern
    pub async fn issue(&self, phone: &str, deadline: &Deadline) -> Result<Otp> {
        let new_otp = NewOtp {
            code: Self::generate_code(self.length),
            phone_number: phone.to_string(),
            key_uid: Uuid::new_v4(),
            expiry_at: self.clock.now() + self.ttl,
        };

        let otp = deadline.run(self.store.insert_otp(&new_otp)).await?;
        info!(
            phone = %mask_phone(phone),
            key_uid = %otp.key_uid,
            expiry_at = %otp.expiry_at,
            "OTP issued"
        );
        Ok(otp)
    }

    /// Match the presented tuple against the stored record. Pure: consumes
    /// nothing.
    pub fn check(
        record: Option<Otp>,
        presented: &OtpTuple,
        now: DateTime<Utc>,
    ) -> std::result::Result<Otp, OtpRejection> {
        let otp = record.ok_or(OtpRejection::NotFound)?;

        if otp.key_uid != presented.key_uid
            || otp.phone_number != presented.phone_number
            || otp.code != presented.code
        {
            return Err(OtpRejection::Mismatch);
        }
        if otp.is_used {
            return Err(OtpRejection::AlreadyUsed);
        }
        if otp.is_expired(now) {
            return Err(OtpRejection::Expired);
        }

        Ok(otp)
    }

    /// Flip `is_used`. Losing a race to another consumer reads as `AlreadyUsed`.
    pub async fn consume(&self, otp: &Otp, now: DateTime<Utc>, deadline: &Deadline) -> Result<()> {
        let consumed = deadline.run(self.store.consume_otp(otp.id, now)).await?;
        if !consumed {
            warn!(
                phone = %mask_phone(&otp.phone_number),
                key_uid = %otp.key_uid,
                "OTP consumed concurrently"
            );
            return Err(AccountError::OtpInvalid(OtpRejection::AlreadyUsed));
        }
        Ok(())
    }

    pub async fn validate_and_consume(
        &self,
        presented: &OtpTuple,
        deadline: &Deadline,
    ) -> Result<Otp> {
        let now = self.clock.now();
        let record = deadline.run(self.store.find_otp(presented.key_uid)).await?;

        let otp = Self::check(record, presented, now).map_err(|reason| {
            warn!(
                phone = %mask_phone(&presented.phone_number),
                key_uid = %presented.key_uid,
                %reason,
                "OTP rejected"
            );
            AccountError::OtpInvalid(reason)
        })?;

        self.consume(&otp, now, deadline).await?;
        Ok(otp)
    }
}

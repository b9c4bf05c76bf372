use super::account::AccountService;
use super::fetch;
use super::lockout;
use crate::error::{AccountError, OtpRejection, Result};
use crate::models::{IssuedOtp, OtpTuple};
use crate::validators::mask_phone;
use tracing::{error, info, warn};

impl AccountService {
    /// Issue an OTP and send the code by SMS in the background. Delivery
    /// failure does not invalidate the code.
    pub async fn new_otp(&self, phone: &str) -> Result<IssuedOtp> {
        let deadline = self.deadline();
        let otp = self.otp.issue(phone, &deadline).await?;

        self.notifier
            .otp_issued(phone, &otp.code, self.otp.ttl().num_minutes().max(1));

        Ok(IssuedOtp {
            key_uid: otp.key_uid,
            expires_at: otp.expiry_at,
        })
    }

    /// Validate and consume a standalone OTP
    pub async fn check_otp(&self, presented: &OtpTuple) -> Result<()> {
        let deadline = self.deadline();
        let otp = self.otp.validate_and_consume(presented, &deadline).await?;

        info!(
            target: "audit",
            phone = %mask_phone(&otp.phone_number),
            key_uid = %otp.key_uid,
            "OTP verified"
        );
        Ok(())
    }

    /// OTP-gated PIN reset. No prior PIN is needed and a locked account is
    /// unlocked by it.
    ///
    /// # Security
    ///
    /// The route is unauthenticated, so an unknown phone number is reported
    /// as an OTP rejection. Callers cannot tell registered numbers apart.
    pub async fn reset_pin(&self, presented: &OtpTuple, new_pin: &str) -> Result<()> {
        let phone = presented.phone_number.as_str();
        let deadline = self.deadline();
        let now = self.otp.now();

        let pin_hash = deadline.run(self.hash_pin(new_pin)).await?;
        let (user, otp) =
            match fetch::fetch_user_and_otp(self.store.as_ref(), presented, now, &deadline).await {
                Ok(found) => found,
                Err(AccountError::UserNotFound) => {
                    warn!(phone = %mask_phone(phone), "PIN reset for unknown phone number");
                    return Err(AccountError::OtpInvalid(OtpRejection::NotFound));
                }
                Err(e) => return Err(e),
            };

        self.otp.consume(&otp, now, &deadline).await?;

        let reset = deadline
            .run(self.store.reset_secret(phone, &pin_hash))
            .await?;
        if !reset {
            error!(
                user_id = %user.id,
                phone = %mask_phone(phone),
                "OTP consumed but PIN reset matched no active account"
            );
            return Err(AccountError::OtpInvalid(OtpRejection::NotFound));
        }

        self.refresh_cache_in_background(phone);
        info!(
            target: "audit",
            user_id = %user.id,
            phone = %mask_phone(phone),
            was_locked = user.locked,
            "PIN reset"
        );
        Ok(())
    }

    /// Authenticated PIN change: old PIN and OTP are both required.
    ///
    /// # Security
    ///
    /// A wrong old PIN counts toward lockout exactly like a failed login, and
    /// the OTP stays unconsumed. The store refuses the write on a locked or
    /// dirty account even if a concurrent failure slipped in.
    pub async fn update_pin(&self, presented: &OtpTuple, old_pin: &str, new_pin: &str) -> Result<()> {
        let phone = presented.phone_number.as_str();
        let deadline = self.deadline();
        let now = self.otp.now();

        let (user, otp) =
            fetch::fetch_user_and_otp(self.store.as_ref(), presented, now, &deadline).await?;

        if self.is_locked(&user) {
            warn!(phone = %mask_phone(phone), "PIN update on locked account");
            return Err(AccountError::AccountLocked);
        }
        if !deadline.run(self.verify_pin(old_pin, &user.pin)).await? {
            return Err(self.record_failed_attempt(&user, &deadline).await);
        }

        let pin_hash = deadline.run(self.hash_pin(new_pin)).await?;
        self.otp.consume(&otp, now, &deadline).await?;

        if lockout::needs_reset(&user.lock_state()) {
            deadline
                .run(self.store.reset_failed_attempts(phone))
                .await?;
        }

        let updated = deadline
            .run(self.store.update_secret(phone, &pin_hash))
            .await?;
        if !updated {
            error!(
                user_id = %user.id,
                phone = %mask_phone(phone),
                "OTP consumed but PIN update was refused by the account guard"
            );
            return Err(AccountError::AccountLocked);
        }

        self.refresh_cache_in_background(phone);
        info!(target: "audit", user_id = %user.id, phone = %mask_phone(phone), "PIN updated");
        Ok(())
    }
}

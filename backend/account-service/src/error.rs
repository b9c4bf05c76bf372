use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AccountError>;

/// Why an OTP tuple was refused. Logged and asserted on, never shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    NotFound,
    AlreadyUsed,
    Expired,
    Mismatch,
}

impl fmt::Display for OtpRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            OtpRejection::NotFound => "not found",
            OtpRejection::AlreadyUsed => "already used",
            OtpRejection::Expired => "expired",
            OtpRejection::Mismatch => "mismatch",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid OTP: {0}")]
    OtpInvalid(OtpRejection),

    #[error("Account locked")]
    AccountLocked,

    #[error("Missing or invalid session token")]
    Unauthorized,

    #[error("Session does not belong to this phone number")]
    Forbidden,

    #[error("Deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AccountError {
    /// HTTP status for the wire envelope
    pub fn status_code(&self) -> u16 {
        match self {
            AccountError::Validation(_) => 400,
            AccountError::InvalidCredentials | AccountError::Unauthorized => 401,
            AccountError::OtpInvalid(_) | AccountError::Forbidden => 403,
            AccountError::UserNotFound => 404,
            AccountError::Timeout(_) => 408,
            AccountError::AlreadyRegistered => 409,
            AccountError::AccountLocked => 423,
            AccountError::Database(_) | AccountError::Jwt(_) | AccountError::Internal(_) => 500,
        }
    }

    /// Message safe to return to the caller
    pub fn public_message(&self) -> String {
        match self {
            AccountError::Validation(msg) => format!("Invalid request data: {}", msg),
            AccountError::UserNotFound => "User not found".to_string(),
            AccountError::AlreadyRegistered => "User already exists".to_string(),
            AccountError::InvalidCredentials => "Invalid phone number or PIN".to_string(),
            // All four rejections read the same from outside
            AccountError::OtpInvalid(_) => "Invalid or expired OTP".to_string(),
            AccountError::AccountLocked => {
                "Account locked: login attempts exceeded, please contact support".to_string()
            }
            AccountError::Unauthorized => "Unauthorized".to_string(),
            AccountError::Forbidden => "Forbidden".to_string(),
            AccountError::Timeout(_) => "Request timeout".to_string(),
            AccountError::Database(_) | AccountError::Jwt(_) | AccountError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        AccountError::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AccountError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AccountError::Jwt(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(err: validator::ValidationErrors) -> Self {
        AccountError::Validation(err.to_string())
    }
}

impl From<kv_cache::CacheError> for AccountError {
    fn from(err: kv_cache::CacheError) -> Self {
        tracing::warn!("Cache error: {}", err);
        AccountError::Internal(format!("cache: {}", err))
    }
}

impl From<tokio::task::JoinError> for AccountError {
    fn from(err: tokio::task::JoinError) -> Self {
        AccountError::Internal(format!("blocking task failed: {}", err))
    }
}

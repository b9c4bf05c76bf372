//! Configuration management for Account Service
//!
//! Settings come from environment variables, with a `.env` file loaded first
//! in debug builds. Everything except `DATABASE_URL` and `JWT_KEY` has a
//! default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: Option<RedisSettings>,
    pub server: ServerSettings,
    pub jwt: JwtSettings,
    pub auth: AuthSettings,
    pub sms: SmsSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            server: ServerSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            auth: AuthSettings::from_env()?,
            sms: SmsSettings::from_env(),
        })
    }
}

fn parse_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", key))
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", "50")?,
            acquire_timeout: parse_or("DATABASE_ACQUIRE_TIMEOUT", "5")?,
        })
    }
}

/// Redis cache settings. Absent when `REDIS_URL` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub url: String,
    /// Budget for a single Redis round trip
    pub op_timeout_ms: u64,
}

impl RedisSettings {
    fn from_env() -> Result<Option<Self>> {
        match env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(Some(Self {
                url,
                op_timeout_ms: parse_or("REDIS_OP_TIMEOUT_MS", "2000")?,
            })),
            _ => {
                warn!("REDIS_URL not set - falling back to in-process cache");
                Ok(None)
            }
        }
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("SERVER_PORT", "4000")?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT signing settings (HS256)
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub expiry_seconds: i64,
    pub issuer: String,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("expiry_seconds", &self.expiry_seconds)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_KEY").context("JWT_KEY must be set")?;
        if secret.len() < 16 {
            anyhow::bail!("JWT_KEY must be at least 16 bytes");
        }

        Ok(Self {
            secret,
            expiry_seconds: parse_or("JWT_EXPIRY_SECONDS", "1800")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "account-service".to_string()),
        })
    }
}

/// Authentication policy: lockout threshold, OTP shape, deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub max_login_attempts: i32,
    pub otp_length: usize,
    pub otp_ttl_secs: i64,
    pub request_timeout_secs: u64,
    pub side_effect_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub default_currency: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            max_login_attempts: 3,
            otp_length: 5,
            otp_ttl_secs: 120,
            request_timeout_secs: 5,
            side_effect_timeout_secs: 3,
            cache_ttl_secs: 86_400,
            default_currency: "XOF".to_string(),
        }
    }
}

impl AuthSettings {
    fn from_env() -> Result<Self> {
        let settings = Self {
            max_login_attempts: parse_or("MAX_LOGIN_ATTEMPTS", "3")?,
            otp_length: parse_or("OTP_LENGTH", "5")?,
            otp_ttl_secs: parse_or("OTP_TTL_SECS", "120")?,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", "5")?,
            side_effect_timeout_secs: parse_or("SIDE_EFFECT_TIMEOUT_SECS", "3")?,
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", "86400")?,
            default_currency: env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "XOF".to_string()),
        };

        if settings.max_login_attempts < 1 {
            anyhow::bail!("MAX_LOGIN_ATTEMPTS must be at least 1");
        }
        if !(4..=8).contains(&settings.otp_length) {
            anyhow::bail!("OTP_LENGTH must be between 4 and 8");
        }

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn side_effect_timeout(&self) -> Duration {
        Duration::from_secs(self.side_effect_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.otp_ttl_secs)
    }
}

/// SMS delivery settings. SNS is used only when `AWS_REGION` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsSettings {
    pub sender_id: String,
    pub use_sns: bool,
}

impl SmsSettings {
    fn from_env() -> Self {
        Self {
            sender_id: env::var("SMS_SENDER_ID").unwrap_or_else(|_| "Wallet".to_string()),
            use_sns: env::var("AWS_REGION").map(|r| !r.is_empty()).unwrap_or(false),
        }
    }
}

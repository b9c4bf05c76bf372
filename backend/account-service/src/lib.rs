/// Account Service Library
///
/// Phone-number accounts with PIN login, lockout after repeated failures,
/// OTP-gated PIN reset/update and account removal.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Database queries (users, wallets, otps)
/// - `store`: `CredentialStore` seam over the database
/// - `cache`: Typed account cache over `kv_cache`
/// - `error`: Error types
/// - `http`: axum routes and handlers
/// - `models`: Records, request bodies, response DTOs
/// - `security`: PIN hashing, session tokens
/// - `services`: Account flows, OTP lifecycle, lockout, fetch orchestration
/// - `validators`: Input validation
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod security;
pub mod services;
pub mod store;
pub mod validators;

// Re-export commonly used types
pub use error::{AccountError, OtpRejection, Result};
pub use services::{AccountDeps, AccountService};
pub use store::{CredentialStore, PgCredentialStore};

/// Service layer for account-service
///
/// - `account`: `AccountService` composition and registration/profile flows
/// - `login`: PIN login and the failed-attempt path
/// - `pin`: OTP issue/check, PIN reset and update
/// - `otp`: OTP lifecycle manager
/// - `lockout`: lockout state machine
/// - `fetch`: deadline-bounded concurrent lookups
/// - `tasks`: detached side effects
/// - `notifications`: SMS delivery (AWS SNS)
pub mod account;
pub mod clock;
pub mod fetch;
pub mod lockout;
mod login;
pub mod notifications;
pub mod otp;
mod pin;
pub mod tasks;

pub use account::{AccountDeps, AccountService};
pub use clock::{Clock, SystemClock};
pub use fetch::Deadline;
pub use notifications::{LogSmsSender, Notifier, SmsSender, SnsSmsSender};
pub use otp::OtpManager;
pub use tasks::BackgroundTasks;

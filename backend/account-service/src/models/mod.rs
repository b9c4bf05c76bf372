pub mod otp;
pub mod requests;
pub mod responses;
pub mod user;
pub mod wallet;

pub use otp::{NewOtp, Otp, OtpTuple};
pub use responses::{AccountSummary, AuthResult, IssuedOtp, UserSummary, WalletSummary};
pub use user::{CredentialState, LockState, NewUser, ProfileChanges, User};
pub use wallet::Wallet;

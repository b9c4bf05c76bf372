/// Database access layer
///
/// Free functions over `&PgPool`. Every lockout or secret mutation is a
/// conditional update whose `WHERE` clause is the guard, and reports whether
/// a row matched.
pub mod otps;
pub mod users;
pub mod wallets;

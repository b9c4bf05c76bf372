/// Security primitives: PIN hashing and session tokens
pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenIssuer};
pub use password::{Argon2Hasher, SecretHasher};

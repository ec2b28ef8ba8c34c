//! Credential checks and session tokens.
//!
//! Both halves are stateless: passwords are verified against an Argon2 PHC
//! string, and session tokens are self-contained HS256 JWTs whose validity is
//! decided by signature and expiry alone.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::{AuthError, Claims, TokenCodec};

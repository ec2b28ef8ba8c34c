//! Database models split into domain-specific modules.

pub mod genre;
pub mod movie;
pub mod user;
pub mod watchlist;

pub use genre::*;
pub use movie::*;
pub use user::*;
pub use watchlist::*;

use serde::Serialize;

/// Response body for create endpoints
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

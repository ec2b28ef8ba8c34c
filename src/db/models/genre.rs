//! Genre models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: i64,
    pub title: String,
}

/// Body of genre create and update requests
#[derive(Debug, Deserialize)]
pub struct GenreRequest {
    pub title: String,
}

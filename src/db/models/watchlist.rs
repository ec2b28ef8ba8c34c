//! Watchlist models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A movie on a user's watchlist
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub user_id: i64,
    pub movie_id: i64,
    /// RFC 3339 timestamp, UTC
    pub added_at: String,
}

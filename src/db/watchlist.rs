//! Per-user watchlist.

use chrono::{SecondsFormat, Utc};

use super::models::{Movie, MovieGenreRow, WatchlistEntry};
use super::movies::fold_rows;
use super::DbPool;

/// Movies on `user_id`'s watchlist, oldest addition first
pub async fn list(db: &DbPool, user_id: i64) -> Result<Vec<Movie>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MovieGenreRow>(
        r#"
        SELECT m.id,
               m.title,
               m.description,
               m.date_of_release,
               m.director,
               m.rating,
               m.trailer_url,
               m.poster_url,
               m.is_watched,
               g.id AS genre_id,
               g.title AS genre_title
        FROM watchlist wl
        JOIN movies m ON m.id = wl.movie_id
        LEFT JOIN movie_genres mg ON mg.movie_id = m.id
        LEFT JOIN genres g ON g.id = mg.genre_id
        WHERE wl.user_id = ?
        ORDER BY wl.added_at ASC, wl.rowid ASC, g.title ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(fold_rows(rows))
}

/// Add a movie to the watchlist. Adding a movie twice keeps the first entry.
pub async fn add(db: &DbPool, user_id: i64, movie_id: i64) -> Result<WatchlistEntry, sqlx::Error> {
    let added_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    sqlx::query("INSERT OR IGNORE INTO watchlist (user_id, movie_id, added_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(movie_id)
        .bind(&added_at)
        .execute(db)
        .await?;

    sqlx::query_as::<_, WatchlistEntry>(
        "SELECT user_id, movie_id, added_at FROM watchlist WHERE user_id = ? AND movie_id = ?",
    )
    .bind(user_id)
    .bind(movie_id)
    .fetch_one(db)
    .await
}

/// Returns `false` when the movie was not on the watchlist
pub async fn remove(db: &DbPool, user_id: i64, movie_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist WHERE user_id = ? AND movie_id = ?")
        .bind(user_id)
        .bind(movie_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

//! Movie queries: filtered listing with genre fan-out, and transactional
//! writes of a movie together with its genre links.

use std::collections::HashMap;

use sqlx::{sqlite::SqliteArguments, query::QueryAs, Sqlite, SqliteConnection};
use tracing::debug;

use super::filters::{build_predicate, BindValue, MovieFilters};
use super::models::{Movie, MovieGenreRow, MovieInput};
use super::DbPool;

/// Movies left-joined to their genres: one row per (movie, genre) pair and a
/// single row with NULL genre columns for a movie without genres.
const MOVIE_GENRE_SELECT: &str = r#"
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
FROM movies m
LEFT JOIN movie_genres mg ON mg.movie_id = m.id
LEFT JOIN genres g ON g.id = mg.genre_id
"#;

fn bind_params<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    params: &'q [BindValue],
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            BindValue::Text(s) => query.bind(s.as_str()),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::Int(i) => query.bind(*i),
        };
    }
    query
}

/// Fold join rows into movies.
///
/// The first row of a movie id materializes its scalar fields; every row that
/// carries a genre appends it. Movies come out in the order their id was first
/// seen, so an ORDER BY on the query survives the fold.
pub fn fold_rows(rows: Vec<MovieGenreRow>) -> Vec<Movie> {
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut movies: Vec<Movie> = Vec::new();

    for row in rows {
        let index = *positions.entry(row.id).or_insert_with(|| {
            movies.push(row.to_movie());
            movies.len() - 1
        });

        if let Some(genre) = row.genre() {
            let genres = &mut movies[index].genres;
            if !genres.iter().any(|g| g.id == genre.id) {
                genres.push(genre);
            }
        }
    }

    movies
}

/// List movies matching `filters`
pub async fn find_all(db: &DbPool, filters: &MovieFilters) -> Result<Vec<Movie>, sqlx::Error> {
    let predicate = build_predicate(filters);
    let sql = format!(
        "{} {} {}, g.title ASC",
        MOVIE_GENRE_SELECT,
        predicate.where_clause(),
        predicate.order_by
    );
    debug!(sql = %sql, params = predicate.params.len(), "Listing movies");

    let rows = bind_params(sqlx::query_as::<_, MovieGenreRow>(&sql), &predicate.params)
        .fetch_all(db)
        .await?;

    Ok(fold_rows(rows))
}

/// Fetch one movie with its genres
pub async fn find_by_id(db: &DbPool, id: i64) -> Result<Option<Movie>, sqlx::Error> {
    let sql = format!("{} WHERE m.id = ? ORDER BY g.title ASC", MOVIE_GENRE_SELECT);
    let rows = sqlx::query_as::<_, MovieGenreRow>(&sql)
        .bind(id)
        .fetch_all(db)
        .await?;

    Ok(fold_rows(rows).into_iter().next())
}

/// Whether a movie with this id exists
pub async fn exists(db: &DbPool, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM movies WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(found.is_some())
}

/// Return the subset of `ids` that name existing genres
pub async fn existing_genre_ids(db: &DbPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT id FROM genres WHERE id IN ({}) ORDER BY id", placeholders);
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    query.fetch_all(db).await
}

/// Replace every genre link of `movie_id` with `genre_ids`
async fn replace_genre_links(
    conn: &mut SqliteConnection,
    movie_id: i64,
    genre_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?")
        .bind(movie_id)
        .execute(&mut *conn)
        .await?;

    let mut ids = genre_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    for genre_id in ids {
        sqlx::query("INSERT INTO movie_genres (movie_id, genre_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Insert a movie and its genre links in one transaction, returning the new id
pub async fn create(db: &DbPool, input: &MovieInput) -> Result<i64, sqlx::Error> {
    let mut tx = db.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO movies (title, description, date_of_release, director, trailer_url, poster_url)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.date_of_release)
    .bind(&input.director)
    .bind(&input.trailer_url)
    .bind(input.poster_url.as_deref().unwrap_or_default())
    .fetch_one(&mut *tx)
    .await?;

    replace_genre_links(&mut *tx, id, &input.genre_ids).await?;

    tx.commit().await?;
    Ok(id)
}

/// Update a movie's fields and replace its genre links in one transaction.
///
/// Returns `false` when no movie has this id.
pub async fn update(db: &DbPool, id: i64, input: &MovieInput) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE movies SET
            title = ?,
            description = ?,
            date_of_release = ?,
            director = ?,
            trailer_url = ?,
            poster_url = COALESCE(?, poster_url)
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.date_of_release)
    .bind(&input.director)
    .bind(&input.trailer_url)
    .bind(input.poster_url.as_deref())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    replace_genre_links(&mut *tx, id, &input.genre_ids).await?;

    tx.commit().await?;
    Ok(true)
}

/// Delete a movie together with its genre links and watchlist entries.
///
/// Returns `false` when no movie has this id.
pub async fn delete(db: &DbPool, id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM watchlist WHERE movie_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM movies WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    tx.commit().await?;
    Ok(true)
}

/// Returns `false` when no movie has this id
pub async fn set_rating(db: &DbPool, id: i64, rating: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE movies SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns `false` when no movie has this id
pub async fn set_watched(db: &DbPool, id: i64, watched: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE movies SET is_watched = ? WHERE id = ?")
        .bind(watched)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ApiJson};
use super::validation::{parse_id, validate_title};
use crate::db::{CreatedResponse, Genre, GenreRequest};
use crate::AppState;

fn genre_id(raw: &str) -> Result<i64, ApiError> {
    parse_id(raw, "genre").map_err(ApiError::validation)
}

pub async fn list_genres(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Genre>>, ApiError> {
    let genres = sqlx::query_as::<_, Genre>("SELECT id, title FROM genres ORDER BY id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(genres))
}

pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Genre>, ApiError> {
    let id = genre_id(&id)?;
    let genre = sqlx::query_as::<_, Genre>("SELECT id, title FROM genres WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Genre not found"))?;
    Ok(Json(genre))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GenreRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    validate_title(&req.title, "Title").map_err(ApiError::validation)?;

    let id: i64 = sqlx::query_scalar("INSERT INTO genres (title) VALUES (?) RETURNING id")
        .bind(req.title.trim())
        .fetch_one(&state.db)
        .await?;

    info!(genre_id = id, title = %req.title.trim(), "Genre created");
    Ok(Json(CreatedResponse { id }))
}

pub async fn update_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<GenreRequest>,
) -> Result<StatusCode, ApiError> {
    let id = genre_id(&id)?;
    validate_title(&req.title, "Title").map_err(ApiError::validation)?;

    let result = sqlx::query("UPDATE genres SET title = ? WHERE id = ?")
        .bind(req.title.trim())
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Genre not found"));
    }

    info!(genre_id = id, "Genre updated");
    Ok(StatusCode::OK)
}

/// Delete a genre; its movie links go with it
pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = genre_id(&id)?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM movie_genres WHERE genre_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM genres WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Genre not found"));
    }
    tx.commit().await?;

    info!(genre_id = id, "Genre deleted");
    Ok(StatusCode::OK)
}

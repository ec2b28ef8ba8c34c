use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::CallerId;
use super::error::ApiError;
use super::validation::parse_id;
use crate::db::{movies, watchlist, Movie, WatchlistEntry};
use crate::AppState;

fn movie_id(raw: &str) -> Result<i64, ApiError> {
    parse_id(raw, "movie").map_err(ApiError::validation)
}

/// The caller's watchlist, oldest addition first
pub async fn list_watchlist(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let movies = watchlist::list(&state.db, user_id).await?;
    Ok(Json(movies))
}

pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(movie_id_raw): Path<String>,
) -> Result<Json<WatchlistEntry>, ApiError> {
    let movie_id = movie_id(&movie_id_raw)?;

    if !movies::exists(&state.db, movie_id).await? {
        return Err(ApiError::not_found("Movie not found"));
    }

    let entry = watchlist::add(&state.db, user_id, movie_id).await?;
    info!(user_id, movie_id, "Added to watchlist");
    Ok(Json(entry))
}

pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Path(movie_id_raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let movie_id = movie_id(&movie_id_raw)?;

    if !watchlist::remove(&state.db, user_id, movie_id).await? {
        return Err(ApiError::not_found("Movie is not on the watchlist"));
    }

    info!(user_id, movie_id, "Removed from watchlist");
    Ok(StatusCode::OK)
}

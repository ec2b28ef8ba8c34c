//! Movie endpoints.
//!
//! Create and update take a multipart form (`title`, `description`,
//! `dateOfRelease`, `director`, `trailerUrl`, repeated `genreIds`, `poster`
//! file). Listing takes `search`, `iswatched`, repeated `genreids` and `sort`
//! query parameters.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ApiError, ApiQuery, ValidationErrorBuilder};
use super::validation::{
    parse_bool_flag, parse_date, parse_id, validate_rating, validate_title, validate_trailer_url,
};
use crate::db::{movies, CreatedResponse, Movie, MovieFilters, MovieInput, SortKey};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MovieListQuery {
    pub search: Option<String>,
    pub iswatched: Option<String>,
    #[serde(default)]
    pub genreids: Vec<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub rating: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWatchedQuery {
    pub is_watched: Option<String>,
}

/// Raw text of a submitted movie form, before validation
#[derive(Debug, Default)]
struct MovieForm {
    title: String,
    description: String,
    date_of_release: String,
    director: String,
    trailer_url: String,
    genre_ids: Vec<String>,
    /// Original file name and content of the uploaded poster
    poster: Option<(String, Bytes)>,
}

fn movie_id(raw: &str) -> Result<i64, ApiError> {
    parse_id(raw, "movie").map_err(ApiError::validation)
}

/// Parse genre ids, accepting both repeated keys and comma-separated lists
fn parse_genre_ids(raw: &[String]) -> Result<Vec<i64>, String> {
    let mut ids = Vec::new();
    for part in raw.iter().flat_map(|r| r.split(',')) {
        if part.trim().is_empty() {
            continue;
        }
        ids.push(parse_id(part, "genre")?);
    }
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

impl MovieListQuery {
    fn into_filters(self) -> Result<MovieFilters, ApiError> {
        let genre_ids = parse_genre_ids(&self.genreids).map_err(ApiError::validation)?;
        let sort = self
            .sort
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(SortKey::parse)
            .transpose()
            .map_err(ApiError::validation)?;

        Ok(MovieFilters {
            search: self.search.filter(|s| !s.trim().is_empty()),
            // An unparseable flag leaves the list unfiltered.
            watched: self.iswatched.as_deref().and_then(parse_bool_flag),
            genre_ids,
            sort,
        })
    }
}

async fn read_form(mut multipart: Multipart) -> Result<MovieForm, ApiError> {
    let mut form = MovieForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = field.text().await?,
            "description" => form.description = field.text().await?,
            "dateOfRelease" => form.date_of_release = field.text().await?,
            "director" => form.director = field.text().await?,
            "trailerUrl" => form.trailer_url = field.text().await?,
            "genreIds" => form.genre_ids.push(field.text().await?),
            "poster" => {
                let file_name = field.file_name().unwrap_or("poster").to_string();
                let data = field.bytes().await?;
                if !data.is_empty() {
                    form.poster = Some((file_name, data));
                }
            }
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Validate the form and resolve it into a store input, storing the poster
/// if one was uploaded
async fn resolve_form(state: &AppState, form: MovieForm) -> Result<MovieInput, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("title", validate_title(&form.title, "Title"))
        .check("trailerUrl", validate_trailer_url(form.trailer_url.trim()));

    let date_of_release = match parse_date(&form.date_of_release) {
        Ok(date) => date,
        Err(message) => {
            errors.add("dateOfRelease", message);
            None
        }
    };
    let genre_ids = match parse_genre_ids(&form.genre_ids) {
        Ok(ids) => ids,
        Err(message) => {
            errors.add("genreIds", message);
            Vec::new()
        }
    };
    errors.finish()?;

    let known = movies::existing_genre_ids(&state.db, &genre_ids).await?;
    let unknown: Vec<String> = genre_ids
        .iter()
        .filter(|id| !known.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(ApiError::validation(format!(
            "Unknown genre id: {}",
            unknown.join(", ")
        )));
    }

    let poster_url = match form.poster {
        Some((file_name, data)) => Some(state.images.put(&file_name, data).await?),
        None => None,
    };

    Ok(MovieInput {
        title: form.title.trim().to_string(),
        description: form.description,
        date_of_release,
        director: form.director.trim().to_string(),
        trailer_url: form.trailer_url.trim().to_string(),
        poster_url,
        genre_ids,
    })
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<MovieListQuery>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let filters = query.into_filters()?;
    let movies = movies::find_all(&state.db, &filters).await?;
    Ok(Json(movies))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Movie>, ApiError> {
    let id = movie_id(&id)?;
    let movie = movies::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie not found"))?;
    Ok(Json(movie))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let form = read_form(multipart?).await?;
    let input = resolve_form(&state, form).await?;

    let id = movies::create(&state.db, &input).await?;

    info!(movie_id = id, title = %input.title, genres = input.genre_ids.len(), "Movie created");
    Ok(Json(CreatedResponse { id }))
}

/// Replace a movie's fields and genres; the poster is kept unless a new one
/// is uploaded
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ApiError> {
    let id = movie_id(&id)?;
    let form = read_form(multipart?).await?;
    let input = resolve_form(&state, form).await?;
    if !movies::update(&state.db, id, &input).await? {
        return Err(ApiError::not_found("Movie not found"));
    }

    info!(movie_id = id, "Movie updated");
    Ok(StatusCode::OK)
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = movie_id(&id)?;

    if !movies::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Movie not found"));
    }

    info!(movie_id = id, "Movie deleted");
    Ok(StatusCode::OK)
}

pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<RateQuery>,
) -> Result<StatusCode, ApiError> {
    let id = movie_id(&id)?;
    let raw = query
        .rating
        .ok_or_else(|| ApiError::validation("Rating is required"))?;
    let rating: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::validation("Rating must be a whole number"))?;
    validate_rating(rating).map_err(ApiError::validation)?;

    if !movies::set_rating(&state.db, id, rating).await? {
        return Err(ApiError::not_found("Movie not found"));
    }

    info!(movie_id = id, rating, "Movie rated");
    Ok(StatusCode::OK)
}

pub async fn set_watched(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<SetWatchedQuery>,
) -> Result<StatusCode, ApiError> {
    let id = movie_id(&id)?;
    let watched = query
        .is_watched
        .as_deref()
        .and_then(parse_bool_flag)
        .ok_or_else(|| ApiError::validation("isWatched must be a boolean"))?;

    if !movies::set_watched(&state.db, id, watched).await? {
        return Err(ApiError::not_found("Movie not found"));
    }

    info!(movie_id = id, watched, "Movie watched state changed");
    Ok(StatusCode::OK)
}

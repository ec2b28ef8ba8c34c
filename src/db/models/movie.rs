//! Movie models and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::genre::Genre;

/// Lowest and highest accepted rating; 0 in the store means "unrated"
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date_of_release: Option<NaiveDate>,
    pub director: String,
    pub rating: i64,
    pub trailer_url: String,
    /// Blob key of the stored poster, empty when there is none
    pub poster_url: String,
    pub is_watched: bool,
    pub genres: Vec<Genre>,
}

/// One row of the movies ⟕ genres join: scalar movie columns plus at most
/// one genre
#[derive(Debug, Clone, FromRow)]
pub struct MovieGenreRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date_of_release: Option<NaiveDate>,
    pub director: String,
    pub rating: i64,
    pub trailer_url: String,
    pub poster_url: String,
    pub is_watched: bool,
    pub genre_id: Option<i64>,
    pub genre_title: Option<String>,
}

impl MovieGenreRow {
    /// Scalar movie fields with an empty genre collection
    pub fn to_movie(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            date_of_release: self.date_of_release,
            director: self.director.clone(),
            rating: self.rating,
            trailer_url: self.trailer_url.clone(),
            poster_url: self.poster_url.clone(),
            is_watched: self.is_watched,
            genres: Vec::new(),
        }
    }

    pub fn genre(&self) -> Option<Genre> {
        match (self.genre_id, &self.genre_title) {
            (Some(id), Some(title)) => Some(Genre {
                id,
                title: title.clone(),
            }),
            _ => None,
        }
    }
}

/// Fields written by movie create and update
#[derive(Debug, Clone, Default)]
pub struct MovieInput {
    pub title: String,
    pub description: String,
    pub date_of_release: Option<NaiveDate>,
    pub director: String,
    pub trailer_url: String,
    /// New poster key; `None` keeps the current poster on update
    pub poster_url: Option<String>,
    pub genre_ids: Vec<i64>,
}

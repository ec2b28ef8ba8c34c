use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiQuery};
use crate::storage::sanitize_key;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageQuery {
    pub image_id: Option<String>,
}

/// Download a stored poster by its key
///
/// GET /images?imageId=<key>
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ImageQuery>,
) -> Result<Response, ApiError> {
    let raw = query
        .image_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::validation("imageId is required"))?;
    let key = sanitize_key(raw.trim()).ok_or_else(|| ApiError::validation("Invalid image id"))?;

    let data = state.images.get(key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", key),
            ),
        ],
        data,
    )
        .into_response())
}

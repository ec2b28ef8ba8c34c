use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ApiJson, ValidationErrorBuilder};
use super::validation::{
    parse_id, validate_email, validate_password, validate_password_confirmation, validate_title,
};
use crate::auth::hash_password;
use crate::db::{
    ChangePasswordRequest, CreateUserRequest, CreatedResponse, UpdateUserRequest, User,
    UserResponse,
};
use crate::AppState;

fn user_id(raw: &str) -> Result<i64, ApiError> {
    parse_id(raw, "user").map_err(ApiError::validation)
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal(format!("Failed to hash password: {}", e))
    })
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users: Vec<User> =
        sqlx::query_as("SELECT id, name, email, password_hash FROM users ORDER BY id")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = user_id(&id)?;
    let user: User = sqlx::query_as("SELECT id, name, email, password_hash FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_title(&req.name, "Name"))
        .check("email", validate_email(req.email.trim()))
        .check("password", validate_password(&req.password))
        .check(
            "confirmPassword",
            validate_password_confirmation(&req.password, &req.confirm_password),
        );
    errors.finish()?;

    let password_hash = hash(&req.password)?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(req.name.trim())
    .bind(req.email.trim())
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    info!(user_id = id, email = %req.email.trim(), "User created");
    Ok(Json(CreatedResponse { id }))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<StatusCode, ApiError> {
    let id = user_id(&id)?;

    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_title(&req.name, "Name"))
        .check("email", validate_email(req.email.trim()));
    errors.finish()?;

    let result = sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
        .bind(req.name.trim())
        .bind(req.email.trim())
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = id, "User updated");
    Ok(StatusCode::OK)
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let id = user_id(&id)?;

    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("password", validate_password(&req.password))
        .check(
            "confirmPassword",
            validate_password_confirmation(&req.password, &req.confirm_password),
        );
    errors.finish()?;

    let password_hash = hash(&req.password)?;
    let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = id, "Password changed");
    Ok(StatusCode::OK)
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = user_id(&id)?;

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = id, "User deleted");
    Ok(StatusCode::OK)
}

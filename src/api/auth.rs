use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ApiJson};
use crate::auth::{hash_password, verify_password};
use crate::config::AuthConfig;
use crate::db::{DbPool, SignInRequest, SignInResponse, User, UserResponse};
use crate::AppState;

/// Id of the authenticated caller, placed in request extensions by
/// [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub i64);

lazy_static! {
    /// Verified against when the email is unknown, so every rejected sign-in
    /// pays for one Argon2 check.
    static ref UNKNOWN_ACCOUNT_HASH: String =
        hash_password(&uuid::Uuid::new_v4().to_string()).unwrap_or_default();
}

/// Hash the attempt is checked against: the account's own, or a stand-in.
fn credential_hash(user: Option<&User>) -> &str {
    user.map_or(UNKNOWN_ACCOUNT_HASH.as_str(), |u| u.password_hash.as_str())
}

/// Returns the user only when the account exists and the password matches.
fn check_credentials(user: Option<User>, password: &str) -> Option<User> {
    let matched = verify_password(password, credential_hash(user.as_ref()));
    user.filter(|_| matched)
}

/// Sign-in endpoint
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as(
        "SELECT id, name, email, password_hash FROM users WHERE email = ?",
    )
    .bind(request.email.trim())
    .fetch_optional(&state.db)
    .await?;

    // Unknown email and wrong password look the same to the client.
    let Some(user) = check_credentials(user, &request.password) else {
        warn!(email = %request.email, "Rejected sign-in");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let token = state.tokens.issue_default(user.id)?;
    info!(user_id = user.id, "User signed in");

    Ok(Json(SignInResponse { token }))
}

/// Current user endpoint
pub async fn user_info(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> Result<Json<UserResponse>, ApiError> {
    let user: Option<User> =
        sqlx::query_as("SELECT id, name, email, password_hash FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

    user.map(|u| Json(UserResponse::from(u)))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Sign-out endpoint. Tokens are not tracked server side, so the client
/// discarding its token is all it takes.
pub async fn sign_out(CallerId(user_id): CallerId) -> StatusCode {
    info!(user_id, "User signed out");
    StatusCode::OK
}

/// Extract the bearer token from an Authorization header value
fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Auth middleware that validates session tokens
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;

    let token = header_value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    let user_id = state.tokens.validate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        ApiError::unauthorized("Invalid token")
    })?;

    request.extensions_mut().insert(CallerId(user_id));
    Ok(next.run(request).await)
}

/// Extractor for the authenticated caller
#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerId>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Authorization header required"))
    }
}

/// Create the configured admin account if no user exists yet
pub async fn ensure_admin_user(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;

    sqlx::query("INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)")
        .bind(&config.admin_name)
        .bind(email)
        .bind(&password_hash)
        .execute(db)
        .await?;

    info!("Created admin user: {}", email);
    Ok(())
}

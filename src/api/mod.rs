pub mod auth;
pub mod error;
mod genres;
mod images;
mod movies;
mod users;
pub mod validation;
mod watchlist;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let public_routes = Router::new()
        .route("/auth/signIn", post(auth::sign_in))
        .route("/images", get(images::get_image))
        .route("/health", get(health_check));

    let movie_routes = Router::new()
        .route("/movies", get(movies::list_movies).post(movies::create_movie))
        .route(
            "/movies/:id",
            get(movies::get_movie)
                .put(movies::update_movie)
                .delete(movies::delete_movie),
        )
        .route("/movies/:id/rate", patch(movies::rate_movie))
        .route("/movies/:id/setWatched", patch(movies::set_watched))
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes));

    // Protected API routes
    let api_routes = Router::new()
        // Session
        .route("/auth/userInfo", get(auth::user_info))
        .route("/auth/signOut", post(auth::sign_out))
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/:id",
            get(genres::get_genre)
                .put(genres::update_genre)
                .delete(genres::delete_genre),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/changePassword", put(users::change_password))
        // Watchlist
        .route("/watchlist", get(watchlist::list_watchlist))
        .route(
            "/watchlist/:movieId",
            post(watchlist::add_to_watchlist).delete(watchlist::remove_from_watchlist),
        )
        .merge(movie_routes)
        // Protected by auth; unmatched paths still fall through to 404
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

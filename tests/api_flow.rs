use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use cinedex::api::{auth::ensure_admin_user, create_router};
use cinedex::config::Config;
use cinedex::storage::LocalBlobStore;
use cinedex::AppState;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "changeme123";
const BOUNDARY: &str = "cinedex-test-boundary";

struct TestApp {
    router: Router,
    images_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let images_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
        config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());
        config.storage.images_dir = images_dir.path().to_path_buf();

        let db = cinedex::db::connect("sqlite::memory:", 1).await.unwrap();
        ensure_admin_user(&db, &config.auth).await.unwrap();

        let images = Arc::new(LocalBlobStore::new(images_dir.path()));
        let state = Arc::new(AppState::new(config, db, images).unwrap());

        Self {
            router: create_router(state),
            images_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn sign_in(&self) -> String {
        let (status, body) = self
            .json(json_request(
                "POST",
                "/auth/signIn",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_genre(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self
            .json(json_request("POST", "/genres", Some(token), json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn create_movie(&self, token: &str, title: &str, genre_ids: &[i64]) -> i64 {
        let mut fields = vec![
            ("title", title.to_string()),
            ("description", format!("About {}", title)),
            ("dateOfRelease", "1999-03-31".to_string()),
            ("director", "Someone".to_string()),
            ("trailerUrl", "https://example.com/trailer".to_string()),
        ];
        for id in genre_ids {
            fields.push(("genreIds", id.to_string()));
        }
        let (status, body) = self
            .json(multipart_request("POST", "/movies", token, &fields, None))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_i64().unwrap()
    }
}

fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn multipart_request(
    method: &str,
    uri: &str,
    token: &str,
    fields: &[(&str, String)],
    poster: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = poster {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"poster\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_state_rejects_out_of_range_token_ttl() {
    let images_dir = tempfile::tempdir().unwrap();
    let db = cinedex::db::connect("sqlite::memory:", 1).await.unwrap();

    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.auth.token_ttl_secs = 1_000_000_000_000_000;

    let images = Arc::new(LocalBlobStore::new(images_dir.path()));
    assert!(AppState::new(config, db, images).is_err());
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_access_gate_messages() {
    let app = TestApp::new().await;

    let (status, body) = app.json(request("GET", "/movies", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Authorization header required" }));

    let (status, body) = app.json(request("GET", "/movies", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid token" }));

    let bad_scheme = Request::builder()
        .uri("/movies")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.json(bad_scheme).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid token" }));
}

#[tokio::test]
async fn test_sign_in_failures_are_indistinguishable() {
    let app = TestApp::new().await;

    let (status, wrong_password) = app
        .json(json_request(
            "POST",
            "/auth/signIn",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = app
        .json(json_request(
            "POST",
            "/auth/signIn",
            None,
            json!({ "email": "nobody@example.com", "password": ADMIN_PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password, json!({ "error": "Invalid credentials" }));
}

#[tokio::test]
async fn test_user_info_and_sign_out() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let (status, body) = app.json(request("GET", "/auth/userInfo", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password_hash").is_none());

    let (status, _) = app.send(request("POST", "/auth/signOut", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_genre_crud() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let id = app.create_genre(&token, "Drama").await;

    let (status, body) = app.json(request("GET", &format!("/genres/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": id, "title": "Drama" }));

    let (status, _) = app
        .send(json_request(
            "PUT",
            &format!("/genres/{id}"),
            Some(&token),
            json!({ "title": "Melodrama" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(request("GET", "/genres", Some(&token))).await;
    assert_eq!(body, json!([{ "id": id, "title": "Melodrama" }]));

    let (status, body) = app
        .json(json_request("POST", "/genres", Some(&token), json!({ "title": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title is required");

    let (status, _) = app.send(request("DELETE", &format!("/genres/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(request("GET", &format!("/genres/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.json(request("GET", "/genres/abc", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid genre id");
}

#[tokio::test]
async fn test_user_management() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let (status, body) = app
        .json(json_request(
            "POST",
            "/users",
            Some(&token),
            json!({
                "name": "Viewer",
                "email": "viewer@example.com",
                "password": "password1",
                "confirmPassword": "password2",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Passwords do not match");

    let (status, body) = app
        .json(json_request(
            "POST",
            "/users",
            Some(&token),
            json!({
                "name": "Viewer",
                "email": "viewer@example.com",
                "password": "password1",
                "confirmPassword": "password1",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let viewer = body["id"].as_i64().unwrap();

    // Duplicate email
    let (status, _) = app
        .json(json_request(
            "POST",
            "/users",
            Some(&token),
            json!({
                "name": "Again",
                "email": "viewer@example.com",
                "password": "password1",
                "confirmPassword": "password1",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request(
            "PUT",
            &format!("/users/{viewer}/changePassword"),
            Some(&token),
            json!({ "password": "newpassword", "confirmPassword": "newpassword" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(json_request(
            "POST",
            "/auth/signIn",
            None,
            json!({ "email": "viewer@example.com", "password": "newpassword" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (_, body) = app.json(request("GET", "/users", Some(&token))).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app.send(request("DELETE", &format!("/users/{viewer}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(request("GET", &format!("/users/{viewer}"), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_movie_lifecycle_with_poster() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;
    let drama = app.create_genre(&token, "Drama").await;
    let scifi = app.create_genre(&token, "Sci-Fi").await;

    let fields = vec![
        ("title", "The Matrix".to_string()),
        ("description", "Red pill".to_string()),
        ("dateOfRelease", "1999-03-31".to_string()),
        ("director", "The Wachowskis".to_string()),
        ("trailerUrl", "https://example.com/matrix".to_string()),
        ("genreIds", scifi.to_string()),
        ("genreIds", drama.to_string()),
    ];
    let (status, body) = app
        .json(multipart_request(
            "POST",
            "/movies",
            &token,
            &fields,
            Some(("matrix.png", b"\x89PNG-data")),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["id"].as_i64().unwrap();

    let (status, movie) = app.json(request("GET", &format!("/movies/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movie["title"], "The Matrix");
    assert_eq!(movie["dateOfRelease"], "1999-03-31");
    assert_eq!(movie["rating"], 0);
    assert_eq!(movie["isWatched"], false);
    assert_eq!(movie["genres"].as_array().unwrap().len(), 2);

    let poster = movie["posterUrl"].as_str().unwrap().to_string();
    assert!(poster.ends_with(".png"));
    assert!(app.images_dir.path().join(&poster).exists());

    // Public download
    let response = app
        .router
        .clone()
        .oneshot(request("GET", &format!("/images?imageId={poster}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{poster}\"").as_str()
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"\x89PNG-data");

    // Update without a poster keeps the old one and replaces genres
    let fields = vec![
        ("title", "The Matrix (1999)".to_string()),
        ("genreIds", drama.to_string()),
    ];
    let (status, body) = app
        .json(multipart_request("PUT", &format!("/movies/{id}"), &token, &fields, None))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, movie) = app.json(request("GET", &format!("/movies/{id}"), Some(&token))).await;
    assert_eq!(movie["title"], "The Matrix (1999)");
    assert_eq!(movie["posterUrl"], poster.as_str());
    assert_eq!(movie["dateOfRelease"], Value::Null);
    assert_eq!(movie["genres"], json!([{ "id": drama, "title": "Drama" }]));

    let (status, _) = app.send(request("DELETE", &format!("/movies/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.json(request("GET", &format!("/movies/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Movie not found" }));
}

#[tokio::test]
async fn test_movie_form_validation() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let (status, body) = app
        .json(multipart_request(
            "POST",
            "/movies",
            &token,
            &[("title", "".to_string())],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title is required");

    let (status, body) = app
        .json(multipart_request(
            "POST",
            "/movies",
            &token,
            &[("title", "Dated".to_string()), ("dateOfRelease", "31/03/1999".to_string())],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));

    let (status, body) = app
        .json(multipart_request(
            "POST",
            "/movies",
            &token,
            &[("title", "Orphan".to_string()), ("genreIds", "999".to_string())],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown genre id: 999");

    let (_, body) = app.json(request("GET", "/movies", Some(&token))).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_movie_list_filters() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;
    let drama = app.create_genre(&token, "Drama").await;
    let comedy = app.create_genre(&token, "Comedy").await;

    let heat = app.create_movie(&token, "Heat", &[drama]).await;
    let airplane = app.create_movie(&token, "Airplane!", &[comedy]).await;
    let dramedy = app.create_movie(&token, "The Dramedy", &[drama, comedy]).await;
    let untagged = app.create_movie(&token, "Untagged", &[]).await;

    let (status, body) = app.json(request("GET", "/movies", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![heat, airplane, dramedy, untagged]);

    let (_, body) = app.json(request("GET", "/movies?search=the", Some(&token))).await;
    assert_eq!(ids(&body), vec![dramedy]);

    let (_, body) = app
        .json(request("GET", &format!("/movies?genreids={comedy}"), Some(&token)))
        .await;
    assert_eq!(ids(&body), vec![airplane, dramedy]);
    // The genre filter does not trim the genre collection
    assert_eq!(body[1]["genres"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .json(request(
            "GET",
            &format!("/movies?genreids={drama}&genreids={comedy}&sort=-title"),
            Some(&token),
        ))
        .await;
    assert_eq!(ids(&body), vec![dramedy, heat, airplane]);

    let (status, _) = app
        .send(request("PATCH", &format!("/movies/{heat}/setWatched?isWatched=true"), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(request("GET", "/movies?iswatched=1", Some(&token))).await;
    assert_eq!(ids(&body), vec![heat]);
    let (_, body) = app.json(request("GET", "/movies?iswatched=false", Some(&token))).await;
    assert_eq!(ids(&body), vec![airplane, dramedy, untagged]);
    let (_, body) = app.json(request("GET", "/movies?iswatched=maybe", Some(&token))).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, body) = app
        .json(request("GET", "/movies?sort=password_hash", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unknown sort field"));

    let (status, _) = app
        .send(request("GET", "/movies?genreids=abc", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_bounds() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;
    let id = app.create_movie(&token, "Rated", &[]).await;

    for rating in [0, 6] {
        let (status, _) = app
            .send(request("PATCH", &format!("/movies/{id}/rate?rating={rating}"), Some(&token)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "rating {rating}");
    }

    let (status, _) = app
        .send(request("PATCH", &format!("/movies/{id}/rate?rating=4"), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, movie) = app.json(request("GET", &format!("/movies/{id}"), Some(&token))).await;
    assert_eq!(movie["rating"], 4);

    let (status, _) = app
        .send(request("PATCH", "/movies/999/rate?rating=4", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(request("PATCH", &format!("/movies/{id}/setWatched?isWatched=perhaps"), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_watchlist_flow() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;
    let first = app.create_movie(&token, "First", &[]).await;
    let second = app.create_movie(&token, "Second", &[]).await;

    for id in [second, first, second] {
        let (status, body) = app
            .json(request("POST", &format!("/watchlist/{id}"), Some(&token)))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["movieId"], id);
    }

    let (_, body) = app.json(request("GET", "/watchlist", Some(&token))).await;
    assert_eq!(ids(&body), vec![second, first]);

    let (status, _) = app.send(request("POST", "/watchlist/999", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(request("DELETE", &format!("/watchlist/{first}"), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Deleting the movie takes it off the watchlist
    let (status, _) = app.send(request("DELETE", &format!("/movies/{second}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(request("GET", "/watchlist", Some(&token))).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_images_cannot_escape_storage_dir() {
    let app = TestApp::new().await;
    let secret = app.images_dir.path().parent().unwrap().join("cinedex-secret.txt");
    std::fs::write(&secret, b"secret").unwrap();

    let (status, _) = app
        .send(request("GET", "/images?imageId=../cinedex-secret.txt", None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(request("GET", "/images?imageId=..", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(request("GET", "/images", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    std::fs::remove_file(secret).unwrap();
}

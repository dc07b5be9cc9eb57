// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use vidtube::config::Config;
use vidtube::db::{Database, FirestoreDb, MemoryDb};
use vidtube::routes::create_router;
use vidtube::services::MediaService;
use vidtube::AppState;

pub const PREFIX: &str = "/api/v1/users";
pub const PASSWORD: &str = "correct horse battery";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app over the in-memory store with mock uploads.
/// Returns the router, the shared state, and a handle to the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>, MemoryDb) {
    let memory = MemoryDb::new();
    let state = Arc::new(AppState::new(
        Config::test_default(),
        Database::Memory(memory.clone()),
        MediaService::new_mock(),
    ));
    (create_router(state.clone()), state, memory)
}

// ─── Multipart ───────────────────────────────────────────────

const BOUNDARY: &str = "----vidtube-test-boundary";

/// Minimal multipart/form-data body builder.
#[derive(Default)]
#[allow(dead_code)]
pub struct MultipartBody {
    body: Vec<u8>,
}

#[allow(dead_code)]
impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, method: &str, uri: &str) -> request::Builder {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        request::Builder {
            inner: Request::builder()
                .method(method)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ),
            body: self.body,
        }
    }
}

pub mod request {
    use super::*;

    /// Request builder that carries a prepared body.
    pub struct Builder {
        pub(super) inner: axum::http::request::Builder,
        pub(super) body: Vec<u8>,
    }

    #[allow(dead_code)]
    impl Builder {
        pub fn header(mut self, name: header::HeaderName, value: &str) -> Self {
            self.inner = self.inner.header(name, value);
            self
        }

        pub fn build(self) -> Request<Body> {
            self.inner.body(Body::from(self.body)).unwrap()
        }
    }
}

/// Complete registration form for `username`.
#[allow(dead_code)]
pub fn registration_form(username: &str) -> MultipartBody {
    MultipartBody::new()
        .text("fullName", "Test User")
        .text("email", &format!("{}@example.com", username))
        .text("username", username)
        .text("password", PASSWORD)
        .file("avatar", "avatar.png", b"\x89PNG avatar bytes")
}

// ─── Requests ────────────────────────────────────────────────

/// JSON request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    body: serde_json::Value,
    bearer: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Bodiless request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Send one request through a clone of the router.
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Collect the body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie header values.
#[allow(dead_code)]
pub fn set_cookie_headers<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The Set-Cookie value for `name`, if present.
#[allow(dead_code)]
pub fn find_cookie<B>(response: &Response<B>, name: &str) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", name)))
}

// ─── Flows ───────────────────────────────────────────────────

/// Register `username` and return the created user (`data`).
#[allow(dead_code)]
pub async fn register(app: &Router, username: &str) -> serde_json::Value {
    let request = registration_form(username)
        .request("POST", &format!("{}/register", PREFIX))
        .build();
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Tokens returned by a successful login.
#[allow(dead_code)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[allow(dead_code)]
pub async fn login(app: &Router, username: &str) -> Session {
    let response = send(
        app,
        json_request(
            "POST",
            &format!("{}/login", PREFIX),
            serde_json::json!({ "username": username, "password": PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    Session {
        user_id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}

/// Register then log in.
#[allow(dead_code)]
pub async fn register_and_login(app: &Router, username: &str) -> Session {
    register(app, username).await;
    login(app, username).await
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use chrono::{Duration, Utc};
use receipt_vault::config::Config;
use receipt_vault::db::Database;
use receipt_vault::models::{GoogleSignIn, User, UserCredentials};
use receipt_vault::routes::create_router;
use receipt_vault::services::google_oauth::OAuthEndpoints;
use receipt_vault::services::session::SESSION_COOKIE;
use receipt_vault::services::{GoogleOAuthClient, InMemoryDrive};
use receipt_vault::AppState;
use std::sync::Arc;

pub const BOUNDARY: &str = "receipt-vault-test-boundary";

/// Router plus handles on its backends.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub drive: Arc<InMemoryDrive>,
}

/// Create a test app over in-memory backends.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_oauth(OAuthEndpoints::default())
}

/// Create a test app whose OAuth client talks to `endpoints`.
#[allow(dead_code)]
pub fn create_test_app_with_oauth(endpoints: OAuthEndpoints) -> TestApp {
    let config = Config::default();
    let drive = Arc::new(InMemoryDrive::new());
    let oauth = GoogleOAuthClient::with_endpoints(&config, endpoints);
    let state = Arc::new(AppState::new(
        config,
        Database::memory(),
        drive.clone(),
        oauth,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        drive,
    }
}

/// Insert a signed-in user with a fresh access token.
/// Returns the user and a `Cookie` header value for its session.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, google_id: &str, email: &str) -> (User, String) {
    let user = state
        .db
        .upsert_google_user(GoogleSignIn {
            google_id: google_id.to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            profile_picture: None,
            credentials: UserCredentials {
                access_token: Some(format!("access-{}", google_id)),
                refresh_token: Some(format!("refresh-{}", google_id)),
                expires_at: Some(Utc::now() + Duration::hours(1)),
            },
        })
        .await
        .unwrap();

    let token = state.sessions.create(user.id).unwrap();
    (user, format!("{}={}", SESSION_COOKIE, token))
}

/// Encode an RGB test image as PNG.
#[allow(dead_code)]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Build a `multipart/form-data` body with a single file field.
#[allow(dead_code)]
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST an upload request for `data` as field `receipt`.
#[allow(dead_code)]
pub fn upload_request(cookie: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/receipts/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("receipt", file_name, "image/png", data)))
        .unwrap()
}

/// Authenticated request with an empty body.
#[allow(dead_code)]
pub fn authed_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

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
            eprintln!("Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

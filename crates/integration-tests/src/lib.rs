//! Shared fixtures for the integration tests: a fully wired `AppState`
//! backed by in-memory SQLite and a throwaway upload directory.

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{CONTENT_TYPE, LOCATION};
use actix_web::test::TestRequest;
use actix_web::web;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rb_api::session::{FLASH_COOKIE, SESSION_COOKIE};
use rb_api::session::SessionKeys;
use rb_api::AppState;
use rb_auth_simple::Argon2CredentialHasher;
use rb_core::traits::BlogRepo;
use rb_core::LikeTracker;
use rb_db_sqlite::SqliteBlogRepo;
use rb_storage_local::LocalMediaStore;
use std::sync::Arc;
use tempfile::TempDir;

pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const PUBLIC_PREFIX: &str = "/static";

pub struct Harness {
    pub state: web::Data<AppState>,
    pub upload_dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_store(|store| store).await
    }

    /// Lets a test tighten the media store (limits, unique names).
    pub async fn with_store(configure: impl FnOnce(LocalMediaStore) -> LocalMediaStore) -> Self {
        Self::with_repo(|repo| Box::new(repo) as Box<dyn BlogRepo>, configure).await
    }

    /// Lets a test wrap the SQLite repository, e.g. to inject failures.
    pub async fn with_repo(
        wrap: impl FnOnce(SqliteBlogRepo) -> Box<dyn BlogRepo>,
        configure: impl FnOnce(LocalMediaStore) -> LocalMediaStore,
    ) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");
        let repo = SqliteBlogRepo::new("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let store = configure(LocalMediaStore::new(
            upload_dir.path().to_path_buf(),
            PUBLIC_PREFIX.to_string(),
        ));

        let state = web::Data::new(AppState {
            repo: wrap(repo),
            store: Box::new(store),
            hasher: Arc::new(Argon2CredentialHasher::new()),
            likes: LikeTracker::new(),
            sessions: SessionKeys::new(SECRET, 1, false),
        });
        Self { state, upload_dir }
    }

    pub fn upload_path(&self) -> String {
        self.upload_dir.path().to_string_lossy().into_owned()
    }
}

/// Builds the actix test service for a `Harness`, wired like the binary.
#[macro_export]
macro_rules! init_app {
    ($harness:expr) => {{
        let harness = &$harness;
        let upload_path = harness.upload_path();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(harness.state.clone())
                .configure(|cfg| {
                    rb_api::configure_media(cfg, $crate::PUBLIC_PREFIX, &upload_path)
                })
                .configure(rb_api::configure_routes),
        )
        .await
    }};
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The flash message a response sets for the next page.
pub fn flash<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == FLASH_COOKIE && !c.value().is_empty())
        .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
}

pub fn form_post(uri: &str, fields: &[(&str, &str)]) -> TestRequest {
    TestRequest::post().uri(uri).set_form(fields.to_vec())
}

const BOUNDARY: &str = "rb-test-boundary-7MA4YWxkTrZu0gW";

/// A `multipart/form-data` POST with text fields and an optional `media` file.
pub fn multipart_post(uri: &str, fields: &[(&str, &str)], media: Option<(&str, &[u8])>) -> TestRequest {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = media {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"media\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    TestRequest::post()
        .uri(uri)
        .insert_header((CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY)))
        .set_payload(body)
}

/// Registers an account and asserts it worked.
#[macro_export]
macro_rules! register {
    ($app:expr, $username:expr, $password:expr) => {{
        let resp = actix_web::test::call_service(
            &$app,
            $crate::form_post("/register", &[("username", $username), ("password", $password)])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        assert_eq!($crate::location(&resp), "/login");
    }};
}

/// Logs in and returns the session cookie, or `None` if login failed.
#[macro_export]
macro_rules! login {
    ($app:expr, $username:expr, $password:expr) => {{
        let resp = actix_web::test::call_service(
            &$app,
            $crate::form_post("/login", &[("username", $username), ("password", $password)])
                .to_request(),
        )
        .await;
        $crate::session_cookie(&resp)
    }};
}

/// GETs `uri` with an optional session and returns the body as a string.
#[macro_export]
macro_rules! get_page {
    ($app:expr, $uri:expr) => {{
        let req = actix_web::test::TestRequest::get().uri($uri).to_request();
        let body = actix_web::test::call_and_read_body(&$app, req).await;
        String::from_utf8(body.to_vec()).expect("utf-8 page")
    }};
    ($app:expr, $uri:expr, $session:expr) => {{
        let req = actix_web::test::TestRequest::get()
            .uri($uri)
            .cookie($session.clone())
            .to_request();
        let body = actix_web::test::call_and_read_body(&$app, req).await;
        String::from_utf8(body.to_vec()).expect("utf-8 page")
    }};
}

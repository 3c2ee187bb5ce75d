//! Shared fixtures for router integration tests: an in-memory store, a
//! temporary upload directory and request helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use ums_api::config::ApiConfig;
use ums_api::{AppState, router};
use ums_core::auth::password::hash_password;
use ums_core::images::LocalImageStore;
use ums_core::models::user::{NewUser, Role, User};
use ums_core::store::{MemoryUserStore, UserStore};

pub const SUPER_ADMIN_EMAIL: &str = "root@example.com";
pub const PASSWORD: &str = "Secret@123";
pub const BOUNDARY: &str = "ums-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub store: Arc<MemoryUserStore>,
    pub uploads: TempDir,
}

pub fn test_config(upload_dir: &std::path::Path) -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: None,
        access_secret: "test-access-secret".into(),
        refresh_secret: "test-refresh-secret".into(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 21_600,
        refresh_cookie_max_age_secs: 1800,
        super_admin_email: SUPER_ADMIN_EMAIL.into(),
        production: false,
        frontend_url: "http://localhost:5173".into(),
        upload_dir: upload_dir.to_path_buf(),
        public_base_url: "http://localhost:5000".into(),
        default_user_password: "HelloWorld@123".into(),
    }
}

/// Route service logs through the test harness so they show up for failing
/// tests only.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ums_api=debug,ums_core=debug"))
        .with_test_writer()
        .try_init();
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();
        let uploads = TempDir::new().expect("tempdir");
        let config = test_config(uploads.path());
        let store = Arc::new(MemoryUserStore::new());
        let images = Arc::new(LocalImageStore::new(
            uploads.path(),
            config.public_base_url.clone(),
        ));
        let state = AppState::new(config, store.clone(), images);
        let router = router(state.clone());
        Self {
            state,
            router,
            store,
            uploads,
        }
    }

    /// A router over the same store and secrets but a different state.
    pub fn router_with(&self, state: AppState) -> Router {
        router(state)
    }

    /// Insert a user straight into the store.
    pub async fn seed(&self, name: &str, email: &str, mobile: &str, role: Role) -> User {
        self.store
            .insert(NewUser {
                name: name.into(),
                email: email.into(),
                mobile: mobile.into(),
                password_hash: hash_password(PASSWORD).expect("hash"),
                profile_pic: None,
                role,
            })
            .await
            .expect("seed user")
    }

    /// A valid access token for `user` issued at the state's current time.
    pub fn token_for(&self, user: &User) -> String {
        self.state
            .tokens
            .issue_access(user.id, self.state.clock.now())
            .expect("issue token")
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        send(&self.router, req).await
    }
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Response {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    /// Value of the `refreshToken` cookie set by this response, if any.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("refreshToken="))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }

    pub fn set_cookie_header(&self) -> String {
        self.headers
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> Response {
    let resp = router.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Response {
        status,
        headers,
        body,
    }
}

/// Status and raw body, for non-JSON responses.
pub async fn send_raw(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = router.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, bytes.to_vec())
}

pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("build request")
}

pub fn refresh_request(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/user/refresh-token");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, format!("refreshToken={cookie}"));
    }
    builder.body(Body::empty()).expect("build request")
}

/// A file part for [`multipart_request`]: content type and bytes.
pub struct FilePart<'a> {
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    image: Option<FilePart<'_>>,
    token: Option<&str>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"profileImage\"; filename=\"avatar\"\r\nContent-Type: {}\r\n\r\n",
                file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).expect("build request")
}

pub fn register_body(name: &str, email: &str, mobile: &str) -> Value {
    json!({
        "name": name,
        "email": email,
        "mobile": mobile,
        "password": PASSWORD,
    })
}

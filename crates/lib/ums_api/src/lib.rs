//! # ums_api
//!
//! HTTP API library for UMS.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use chrono::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use ums_core::auth::access::AccessPolicy;
use ums_core::auth::jwt::TokenIssuer;
use ums_core::clock::{Clock, SystemClock};
use ums_core::images::{ImageStore, MAX_IMAGE_BYTES};
use ums_core::store::UserStore;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, profile};
use crate::services::cookies::CookieSettings;

/// Room for multipart framing and text fields around a maximum-size image.
const FORM_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 256 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User record store.
    pub store: Arc<dyn UserStore>,
    /// Profile image storage.
    pub images: Arc<dyn ImageStore>,
    /// Access/refresh token issuer and verifier.
    pub tokens: TokenIssuer,
    /// Role and ownership rules.
    pub policy: AccessPolicy,
    /// Refresh cookie attributes.
    pub cookies: CookieSettings,
    /// Time source for token issuance and verification.
    pub clock: Arc<dyn Clock>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn UserStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let tokens = TokenIssuer::new(
            config.access_secret.as_bytes(),
            config.refresh_secret.as_bytes(),
            Duration::seconds(config.access_token_ttl_secs),
            Duration::seconds(config.refresh_token_ttl_secs),
        );
        if config.access_secret == config.refresh_secret {
            warn!("access and refresh tokens share a signing secret");
        }
        Self {
            store,
            images,
            tokens,
            policy: AccessPolicy::new(&config.super_admin_email),
            cookies: CookieSettings::from_config(&config),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origin = match HeaderValue::from_str(&config.frontend_url) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!(frontend_url = %config.frontend_url, "invalid FRONTEND_URL, CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_USER_REGISTER, post(auth::register_handler))
        .route(routes::POST_USER_LOGIN, post(auth::login_handler))
        .route(routes::POST_USER_REFRESH_TOKEN, post(auth::refresh_handler))
        .route(routes::POST_USER_LOGOUT, post(auth::logout_handler));

    // Authenticated user routes
    let protected = Router::new()
        .route(routes::GET_USER_ME, get(auth::me_handler))
        .route(
            routes::USER_PROFILE,
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .route(routes::PUT_USER_PASSWORD, put(profile::change_password_handler))
        .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Admin routes: authenticate first, then check the role. `route_layer`
    // keeps unmatched paths out of the auth middleware.
    let admin = Router::new()
        .route(routes::GET_ADMIN_USERS, get(admin::list_users_handler))
        .route(routes::POST_ADMIN_CREATE_USER, post(admin::create_user_handler))
        .route(routes::PUT_ADMIN_UPDATE_USER, put(admin::update_user_handler))
        .route(routes::DELETE_ADMIN_DELETE_USER, delete(admin::delete_user_handler))
        .route(
            routes::DELETE_ADMIN_SOFT_DELETE_USER,
            delete(admin::soft_delete_user_handler),
        )
        .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .nest_service(routes::UPLOADS, ServeDir::new(&state.config.upload_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

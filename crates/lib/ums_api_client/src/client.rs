//! Request execution with bearer attachment and transparent token refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::models::{ImageFile, RefreshResponse, User};
use crate::refresh::{RefreshCoordinator, RefreshFailure};
use crate::session::{Session, SessionContext, SessionStorage};

pub(crate) const REGISTER: &str = "/user/register";
pub(crate) const LOGIN: &str = "/user/login";
pub(crate) const REFRESH: &str = "/user/refresh-token";
pub(crate) const LOGOUT: &str = "/user/logout";

/// Endpoints whose 401 means "bad credentials", never "stale token".
const AUTH_ENDPOINTS: &[&str] = &[REGISTER, LOGIN, REFRESH, LOGOUT];

const EVENT_CAPACITY: usize = 16;

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(User),
    LoggedOut,
    /// The refresh token was rejected and the session has been dropped. Sent
    /// once per session.
    Expired { message: String },
}

/// Where a request is in its authentication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Not yet answered, or answered without a 401.
    Pending,
    /// Got a 401 and is waiting on the shared refresh.
    AwaitingRefresh,
    /// Re-sent once with a new token. A second 401 is final.
    Retried,
    /// Gave up; the caller receives the original error.
    Failed,
}

impl RequestState {
    /// Transition on a 401 response.
    pub fn on_unauthorized(self, retryable: bool) -> Self {
        match self {
            RequestState::Pending if retryable => RequestState::AwaitingRefresh,
            _ => RequestState::Failed,
        }
    }
}

/// One form part, kept as plain data so the body can be rebuilt for a retry.
#[derive(Debug, Clone)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: ImageFile },
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// A request description that can be sent more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: &impl Serialize) -> ClientResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_ENDPOINTS.contains(&self.path.as_str())
    }
}

fn build_form(parts: &[FormPart]) -> ClientResult<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File { name, file } => form.part(
                name.clone(),
                Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)?,
            ),
        };
    }
    Ok(form)
}

/// UMS API client.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: Arc<SessionContext>,
    refresher: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
    expiry_notified: AtomicBool,
}

impl ApiClient {
    /// Client for `base_url` with its session in `storage`. The HTTP client
    /// keeps a cookie store so the refresh cookie travels automatically.
    pub fn new(base_url: &str, storage: Arc<dyn SessionStorage>) -> ClientResult<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Self::with_http_client(base_url, storage, http)
    }

    pub fn with_http_client(
        base_url: &str,
        storage: Arc<dyn SessionStorage>,
        http: reqwest::Client,
    ) -> ClientResult<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            http,
            base: Url::parse(base_url)?,
            session: Arc::new(SessionContext::new(storage)),
            refresher: RefreshCoordinator::new(),
            events,
            expiry_notified: AtomicBool::new(false),
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(path)?)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Record a successful login or registration.
    pub(crate) fn begin_session(&self, user: User, access_token: String) {
        self.session.set(Session::authenticated(user.clone(), access_token));
        self.expiry_notified.store(false, Ordering::SeqCst);
        info!(user_id = %user.id, "session started");
        self.emit(SessionEvent::LoggedIn(user));
    }

    pub(crate) fn end_session(&self) {
        self.session.clear();
        self.emit(SessionEvent::LoggedOut);
    }

    /// Drop the session after a failed refresh, announcing it once.
    fn expire_session(&self, message: &str) {
        self.session.clear();
        if !self.expiry_notified.swap(true, Ordering::SeqCst) {
            warn!(%message, "session expired");
            self.emit(SessionEvent::Expired {
                message: message.to_string(),
            });
        }
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> ClientResult<reqwest::Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path)?);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };
        Ok(builder.send().await?)
    }

    /// Send `request`, refreshing the access token and retrying once on a 401.
    /// Returns the final response whatever its status, except that a 401 which
    /// could not be recovered comes back as [`ClientError::Api`].
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<reqwest::Response> {
        let mut state = RequestState::Pending;
        loop {
            let sent_token = self.session.access_token();
            let response = self.send_once(request, sent_token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            let retryable = !request.is_auth_endpoint() && sent_token.is_some();
            state = state.on_unauthorized(retryable);
            if state == RequestState::Failed {
                return Err(ClientError::from_response(response).await);
            }

            // AwaitingRefresh
            let current = self.session.access_token();
            if current.is_none() {
                debug!(path = %request.path, "session already gone, not refreshing");
                return Err(ClientError::from_response(response).await);
            }
            if current != sent_token {
                debug!(path = %request.path, "token already replaced, retrying");
                state = RequestState::Retried;
                continue;
            }

            match self.refresh_access_token().await {
                // Logged out while the refresh was in flight.
                Ok(_) if self.session.access_token().is_none() => {
                    debug!(path = %request.path, "session ended during refresh");
                    return Err(ClientError::from_response(response).await);
                }
                Ok(_) => {
                    debug!(path = %request.path, "retrying with refreshed token");
                    state = RequestState::Retried;
                }
                Err(failure) => {
                    state = RequestState::Failed;
                    debug!(path = %request.path, ?state, "refresh failed");
                    // Only the session the refresh was for is expired; a
                    // logout or new login in the meantime stands.
                    if self.session.access_token() == sent_token {
                        self.expire_session(&failure.message);
                    }
                    return Err(ClientError::from_response(response).await);
                }
            }
        }
    }

    /// Obtain a new access token via the refresh cookie. Concurrent callers
    /// share one request. The token is only installed if the session still
    /// holds the token it replaces when the response arrives.
    pub async fn refresh_access_token(&self) -> Result<String, RefreshFailure> {
        let http = self.http.clone();
        let session = self.session.clone();
        let replaced = self.session.access_token();
        let url = self.url(REFRESH).map_err(|e| RefreshFailure {
            status: None,
            message: e.to_string(),
        })?;

        self.refresher
            .run(move || async move {
                let response = http.post(url).send().await.map_err(|e| RefreshFailure {
                    status: e.status(),
                    message: e.to_string(),
                })?;
                if !response.status().is_success() {
                    let status = response.status();
                    let message = match ClientError::from_response(response).await {
                        ClientError::Api { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(RefreshFailure {
                        status: Some(status),
                        message,
                    });
                }
                let body: RefreshResponse = response.json().await.map_err(|e| RefreshFailure {
                    status: None,
                    message: e.to_string(),
                })?;
                let installed = replaced.as_deref().is_some_and(|old| {
                    session.replace_access_token(old, body.new_access_token.clone())
                });
                if !installed {
                    debug!("refreshed token not installed, session changed");
                }
                Ok(body.new_access_token)
            })
            .await
    }

    /// Execute and decode a JSON success body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ClientResult<T> {
        let response = self.execute(request).await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

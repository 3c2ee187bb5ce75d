//! # ums_api_client
//!
//! HTTP client for the UMS API. Keeps the session (user + access token) in a
//! durable [`SessionStorage`], attaches the bearer token to every request and
//! transparently refreshes an expired access token through the refresh cookie,
//! with at most one refresh in flight.

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod refresh;
pub mod session;

pub use client::{ApiClient, ApiRequest, RequestBody, RequestState, SessionEvent};
pub use error::{ClientError, ClientResult};
pub use session::{FileStorage, MemoryStorage, Session, SessionContext, SessionState, SessionStorage};

//! Single-flight access token refresh.
//!
//! Every caller that needs a new token while a refresh is running awaits the
//! same shared future and receives the same result.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::StatusCode;
use tracing::debug;

/// Why a refresh did not produce a token. Cloned to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub status: Option<StatusCode>,
    pub message: String,
}

pub type RefreshResult = Result<String, RefreshFailure>;

type InFlight = Shared<BoxFuture<'static, RefreshResult>>;

#[derive(Default)]
pub struct RefreshCoordinator {
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the refresh in flight, or start one with `start`.
    pub async fn run<F, Fut>(&self, start: F) -> RefreshResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshResult> + Send + 'static,
    {
        let shared = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => {
                    debug!("joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    debug!("starting token refresh");
                    let fresh = start().boxed().shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        let result = shared.clone().await;

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }
        result
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

//! Single-flight session refresh.
//!
//! ARCHITECTURE
//! ============
//! Idle -> Refreshing -> Idle. The first caller that needs a refresh starts
//! `POST /api/auth/refresh` and parks a `Shared` future in `in_flight`; every
//! caller arriving while it is pending awaits a clone of that same future and
//! observes the same outcome. The shared future clears `in_flight` itself the
//! moment the exchange settles, so the next caller after settlement starts a
//! fresh refresh instead of reusing a stale result.
//!
//! TRADE-OFFS
//! ==========
//! A refresh rejected with an authorization status clears the session (it can
//! never recover), while a transport failure keeps it: the network may come
//! back and the stored token may still be good.

#[cfg(test)]
#[path = "refresh_test.rs"]
mod refresh_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;

use super::envelope::{ApiRequest, build_envelope};
use super::transport::Transport;
use crate::error::is_auth_failure;
use crate::session::SessionStore;

pub const REFRESH_PATH: &str = "/api/auth/refresh";

type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

struct RefreshInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    in_flight: Mutex<Option<PendingRefresh>>,
    session_expired: AtomicBool,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                base_url: base_url.into(),
                transport,
                session,
                in_flight: Mutex::new(None),
                session_expired: AtomicBool::new(false),
            }),
        }
    }

    /// Obtain a fresh token, joining any refresh already in flight.
    ///
    /// Returns `None` when the refresh failed or the server answered without
    /// a token; callers then fall back to the token they already had.
    pub async fn refresh_once(&self) -> Option<String> {
        let pending = {
            let mut slot = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.as_ref() {
                tracing::debug!("joining in-flight session refresh");
                pending.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let pending = async move {
                    let token = inner.exchange().await;
                    inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take();
                    token
                }
                .boxed()
                .shared();
                *slot = Some(pending.clone());
                pending
            }
        };
        pending.await
    }

    /// True while a refresh is pending.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// True after the server rejected a refresh outright; reset by the next
    /// successful refresh or by [`RefreshCoordinator::reset_expired`].
    #[must_use]
    pub fn session_expired(&self) -> bool {
        self.inner.session_expired.load(Ordering::Acquire)
    }

    /// Forget a previous expiry, e.g. after a fresh login.
    pub fn reset_expired(&self) {
        self.inner.session_expired.store(false, Ordering::Release);
    }
}

impl RefreshInner {
    async fn exchange(&self) -> Option<String> {
        let request = ApiRequest::post(REFRESH_PATH).anonymous();
        let envelope = build_envelope(&self.base_url, &request, None);

        let response = match self.transport.send(envelope).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "session refresh request failed");
                return None;
            }
        };

        if response.is_success() {
            let Some(token) = refreshed_token(&response.body) else {
                tracing::warn!(status = response.status, "session refresh returned no token");
                return None;
            };
            if let Err(e) = self.session.replace_token(&token) {
                tracing::warn!(error = %e, "refreshed token could not be persisted");
            }
            self.session_expired.store(false, Ordering::Release);
            tracing::info!("session refreshed");
            return Some(token);
        }

        if is_auth_failure(response.status) {
            tracing::warn!(status = response.status, "session refresh rejected; signing out");
            self.session_expired.store(true, Ordering::Release);
            if let Err(e) = self.session.clear() {
                tracing::warn!(error = %e, "expired session could not be removed from storage");
            }
        } else {
            tracing::warn!(status = response.status, "session refresh failed");
        }
        None
    }
}

/// Token from a refresh response: `access_token`, falling back to `token`.
pub(crate) fn refreshed_token(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["access_token", "token"]
        .iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .find(|token| !token.is_empty())
        .map(str::to_owned)
}

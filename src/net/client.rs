//! Authenticated API client.
//!
//! DESIGN
//! ======
//! `ApiClient` is the session context every feature module is handed: it owns
//! the transport, the session store, and the refresh coordinator, and exposes
//! one call path ([`ApiClient::call`]) that recovers from a stale token.
//! Cloning is cheap and all clones share the same session and coordinator.
//!
//! Retry policy: a bearer call that fails with 401/403/419 triggers exactly one
//! shared refresh and exactly one re-send. The re-send uses the refreshed
//! token, or the prior token when the refresh produced none (expected to fail
//! again and surface as `SessionExpired`). Nothing else is retried.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::envelope::{ApiRequest, AuthMode, build_envelope};
use super::file_urls::to_backend_url;
use super::refresh::RefreshCoordinator;
use super::transport::{RawResponse, ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::{ApiError, is_auth_failure};
use crate::session::{FileStorage, SessionStorage, SessionStore};

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    refresh: RefreshCoordinator,
    /// Contact-detail lookups keyed by `m:<id>` / `u:<id>`; `None` caches a miss.
    contact_details: Mutex<HashMap<String, Option<Value>>>,
}

impl ApiClient {
    /// Client using reqwest and a file-backed session at `config.session_file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(config.session_file.clone()));
        Self::with_storage(config, storage)
    }

    /// Client using reqwest and the given session storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(config: &ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.timeouts)?);
        Ok(Self::with_transport(config.api_base_url.clone(), transport, storage))
    }

    /// Client over an arbitrary transport. The session is loaded from `storage`.
    #[must_use]
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let base_url = base_url.into();
        let session = Arc::new(SessionStore::load(storage));
        let refresh = RefreshCoordinator::new(base_url.clone(), Arc::clone(&transport), Arc::clone(&session));
        Self {
            inner: Arc::new(ClientInner {
                base_url,
                transport,
                session,
                refresh,
                contact_details: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn refresh(&self) -> &RefreshCoordinator {
        &self.inner.refresh
    }

    /// Resolve a server-relative file URL (avatar, report image, attachment).
    #[must_use]
    pub fn file_url(&self, raw: &str) -> String {
        to_backend_url(&self.inner.base_url, raw)
    }

    /// Perform one logical call, recovering once from an authorization failure.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Network`] if no response arrives.
    /// - [`ApiError::SessionExpired`] if authorization still fails after the retry.
    /// - [`ApiError::Http`] for any other non-2xx response.
    pub async fn call(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let prior_token = match request.auth {
            AuthMode::Bearer => self.inner.session.token(),
            AuthMode::Anonymous => None,
        };

        let first = self.send_once(&request, prior_token.as_deref(), 1).await?;
        if first.is_success() {
            return Ok(first);
        }
        if request.auth == AuthMode::Anonymous || !is_auth_failure(first.status) {
            return Err(http_error(first));
        }

        tracing::debug!(path = %request.path, status = first.status, "authorization failed; refreshing session");
        let retry_token = self.inner.refresh.refresh_once().await.or(prior_token);

        let second = self.send_once(&request, retry_token.as_deref(), 2).await?;
        if second.is_success() {
            return Ok(second);
        }
        if is_auth_failure(second.status) {
            return Err(ApiError::SessionExpired { status: second.status, body: second.body });
        }
        Err(http_error(second))
    }

    /// [`ApiClient::call`] and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Everything [`ApiClient::call`] returns, plus [`ApiError::Decode`] when the
    /// body does not match `T`.
    pub async fn call_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.call(request).await?;
        decode_json(&path, &response)
    }

    /// Look up a cached contact detail. Outer `None` means "never fetched".
    pub(crate) fn cached_contact(&self, key: &str) -> Option<Option<Value>> {
        self.inner
            .contact_details
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub(crate) fn cache_contact(&self, key: String, detail: Option<Value>) {
        self.inner
            .contact_details
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, detail);
    }

    async fn send_once(&self, request: &ApiRequest, token: Option<&str>, attempt: u8) -> Result<RawResponse, ApiError> {
        let envelope = build_envelope(&self.inner.base_url, request, token);
        tracing::debug!(method = %request.method, url = %envelope.url, attempt, "api request");
        let response = self.inner.transport.send(envelope).await?;
        tracing::debug!(path = %request.path, status = response.status, attempt, "api response");
        Ok(response)
    }
}

fn http_error(response: RawResponse) -> ApiError {
    ApiError::Http { status: response.status, status_text: response.status_text, body: response.body }
}

pub(crate) fn decode_json<T: DeserializeOwned>(path: &str, response: &RawResponse) -> Result<T, ApiError> {
    let body = if response.body.trim().is_empty() { "null" } else { response.body.as_str() };
    serde_json::from_str(body).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
}

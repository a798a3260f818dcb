//! Scripted transport for unit tests.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;

use super::client::ApiClient;
use super::envelope::Envelope;
use super::transport::{RawResponse, Transport};
use crate::error::ApiError;
use crate::session::{MemoryStorage, SessionUser};

pub(crate) const TEST_BASE: &str = "http://api.test";

type Handler = Box<dyn Fn(&Envelope) -> Result<RawResponse, ApiError> + Send + Sync>;

/// Transport that answers from a closure and records every envelope it sees.
pub(crate) struct FakeTransport {
    handler: Handler,
    sent: Mutex<Vec<Envelope>>,
    refresh_delay: Option<Duration>,
}

impl FakeTransport {
    pub(crate) fn new(handler: impl Fn(&Envelope) -> Result<RawResponse, ApiError> + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler), sent: Mutex::new(Vec::new()), refresh_delay: None }
    }

    /// Hold refresh responses back so concurrent callers pile up behind one.
    pub(crate) fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub(crate) fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of requests whose path equals `path`.
    pub(crate) fn count(&self, path: &str) -> usize {
        self.sent().iter().filter(|e| path_of(&e.url) == path).count()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, envelope: Envelope) -> Result<RawResponse, ApiError> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(envelope.clone());
        if let Some(delay) = self.refresh_delay {
            if path_of(&envelope.url) == "/api/auth/refresh" {
                tokio::time::sleep(delay).await;
            }
        }
        (self.handler)(&envelope)
    }
}

/// Path portion of a URL (origin stripped, query kept).
pub(crate) fn path_of(url: &str) -> &str {
    url.strip_prefix(TEST_BASE).unwrap_or(url)
}

pub(crate) fn json(status: u16, value: Value) -> Result<RawResponse, ApiError> {
    Ok(RawResponse {
        status,
        status_text: reason(status).to_owned(),
        body: value.to_string(),
    })
}

pub(crate) fn text(status: u16, body: &str) -> Result<RawResponse, ApiError> {
    Ok(RawResponse {
        status,
        status_text: reason(status).to_owned(),
        body: body.to_owned(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        419 => "Session Expired",
        _ => "Error",
    }
}

pub(crate) fn client_with(transport: &Arc<FakeTransport>) -> ApiClient {
    ApiClient::with_transport(TEST_BASE, Arc::clone(transport) as Arc<dyn Transport>, Arc::new(MemoryStorage::new()))
}

pub(crate) fn signed_in(transport: &Arc<FakeTransport>, token: &str) -> ApiClient {
    let client = client_with(transport);
    client
        .session()
        .set(token, SessionUser { role: "missionary".to_owned(), email: "a@b.com".to_owned() })
        .unwrap();
    client
}

//! HTTP transport seam.
//!
//! DESIGN
//! ======
//! [`Transport`] is the only place bytes leave the process. Production code
//! uses [`ReqwestTransport`]; tests inject a scripted fake so refresh and
//! retry sequencing can be exercised without a server.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::envelope::{Envelope, FormPart, MultipartForm, Payload};
use crate::config::Timeouts;
use crate::error::ApiError;

/// Status line and body text of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one resolved envelope and returns whatever the server answered.
///
/// Non-2xx statuses are NOT errors at this layer; only transport failures
/// (no response at all) are.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] when no response is received.
    async fn send(&self, envelope: Envelope) -> Result<RawResponse, ApiError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a cookie store and the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the TLS backend cannot be initialized.
    pub fn new(timeouts: Timeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Network(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, envelope: Envelope) -> Result<RawResponse, ApiError> {
        let mut builder = self.http.request(envelope.method.clone(), &envelope.url);
        if let Some(token) = &envelope.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = envelope.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder = match envelope.payload {
            Payload::Empty => builder,
            Payload::Json(text) => builder.body(text),
            Payload::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            body,
        })
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<reqwest::multipart::Form, ApiError> {
    let mut out = reqwest::multipart::Form::new();
    for part in form.parts() {
        out = match part {
            FormPart::Text { name, value } => out.text(name.clone(), value.clone()),
            FormPart::File { name, attachment } => {
                let file = reqwest::multipart::Part::bytes(attachment.bytes.clone())
                    .file_name(attachment.file_name.clone())
                    .mime_str(&attachment.mime)
                    .map_err(|e| ApiError::Invalid(format!("invalid MIME type {}: {e}", attachment.mime)))?;
                out.part(name.clone(), file)
            }
        };
    }
    Ok(out)
}

//! Request envelopes: URL joining and body encoding.
//!
//! DESIGN
//! ======
//! Callers describe a call with a logical path (`/api/me/reports`) and a body.
//! [`build_envelope`] turns that into exactly one URL plus a transmit-ready
//! payload. It is pure so the URL rules can be tested without a network.
//!
//! Multipart bodies stay as an owned [`MultipartForm`] rather than a
//! `reqwest::multipart::Form` so a call can be re-sent after a token refresh.

#[cfg(test)]
#[path = "envelope_test.rs"]
mod envelope_test;

use std::fmt;
use std::path::Path;

use reqwest::Method;
use serde::Serialize;

use crate::error::ApiError;

// =============================================================================
// CALL DESCRIPTOR
// =============================================================================

/// Whether a call carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Send `Authorization: Bearer <token>` when a token is held, and recover
    /// from authorization failures with one refresh-and-retry.
    Bearer,
    /// Send no credentials header (login, register, refresh).
    Anonymous,
}

/// Request body before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Serialize any `Serialize` value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] if the value cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ApiError::Invalid(format!("request body is not valid JSON: {e}")))
    }
}

/// One logical API call. Ephemeral: built per call, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub auth: AuthMode,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: RequestBody::Empty, auth: AuthMode::Bearer }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] if the value cannot be represented as JSON.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.with_body(RequestBody::json(value)?))
    }

    #[must_use]
    pub fn with_form(self, form: MultipartForm) -> Self {
        self.with_body(RequestBody::Multipart(form))
    }

    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }
}

// =============================================================================
// MULTIPART
// =============================================================================

/// A file to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), mime: mime.into(), bytes }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, ApiError> {
        let bytes = std::fs::read(path).map_err(|e| ApiError::Invalid(format!("cannot read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_owned(), |name| name.to_string_lossy().into_owned());
        let mime = mime_for_path(path).to_owned();
        Ok(Self { file_name, mime, bytes })
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// MIME type for the handful of extensions the report and avatar uploads accept.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, attachment: Attachment },
}

/// Owned, cloneable multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text { name: name.into(), value: value.into() });
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.parts.push(FormPart::File { name: name.into(), attachment });
        self
    }

    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Value of the first text part called `name`.
    #[must_use]
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// All file parts called `name`, in insertion order.
    #[must_use]
    pub fn files(&self, name: &str) -> Vec<&Attachment> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                FormPart::File { name: n, attachment } if n == name => Some(attachment),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Encoded payload ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    /// Serialized JSON text; sent with `Content-Type: application/json`.
    Json(String),
    /// Content type (with boundary) is chosen by the transport.
    Multipart(MultipartForm),
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub method: Method,
    pub url: String,
    pub payload: Payload,
    pub bearer: Option<String>,
}

impl Envelope {
    /// `Content-Type` header the envelope requires, if the transport should set one.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        match self.payload {
            Payload::Json(_) => Some("application/json"),
            Payload::Empty | Payload::Multipart(_) => None,
        }
    }
}

/// Resolve a call descriptor against `base` into a transmit-ready envelope.
///
/// `token` is attached only for [`AuthMode::Bearer`] calls.
#[must_use]
pub fn build_envelope(base: &str, request: &ApiRequest, token: Option<&str>) -> Envelope {
    let payload = match &request.body {
        RequestBody::Empty => Payload::Empty,
        RequestBody::Json(value) => Payload::Json(value.to_string()),
        RequestBody::Multipart(form) => Payload::Multipart(form.clone()),
    };
    let bearer = match request.auth {
        AuthMode::Bearer => token.filter(|t| !t.is_empty()).map(str::to_owned),
        AuthMode::Anonymous => None,
    };
    Envelope { method: request.method.clone(), url: join_url(base, &request.path), payload, bearer }
}

// =============================================================================
// URL JOINING
// =============================================================================

/// True when `raw` starts with a URL scheme such as `https://`.
#[must_use]
pub fn has_scheme(raw: &str) -> bool {
    let Some(idx) = raw.find("://") else {
        return false;
    };
    let scheme = &raw[..idx];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Join `path` onto `base` with exactly one separating slash.
///
/// Absolute paths, and any path under an empty base, are returned
/// unchanged. Consecutive duplicate `api`
/// segments in the result collapse to one, so a base ending in `/api` and a
/// path starting with `/api/` do not produce `/api/api/`.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    if has_scheme(path) {
        return path.to_owned();
    }
    let base = base.trim();
    if base.is_empty() {
        return path.to_owned();
    }
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    collapse_api_segments(&joined)
}

/// Collapse runs of consecutive `api` path segments into a single segment.
fn collapse_api_segments(url: &str) -> String {
    let path_start = match url.find("://") {
        Some(idx) => match url[idx + 3..].find('/') {
            Some(slash) => idx + 3 + slash,
            None => return url.to_owned(),
        },
        None => 0,
    };
    let (origin, rest) = url.split_at(path_start);
    let path_end = rest.find(['?', '#']).unwrap_or(rest.len());
    let (path, suffix) = rest.split_at(path_end);

    let mut collapsed = String::with_capacity(path.len());
    let mut previous_was_api = false;
    for (i, segment) in path.split('/').enumerate() {
        let is_api = segment == "api";
        if is_api && previous_was_api {
            continue;
        }
        if i > 0 {
            collapsed.push('/');
        }
        collapsed.push_str(segment);
        previous_was_api = is_api;
    }

    format!("{origin}{collapsed}{suffix}")
}

//! Networking: envelopes, transport, refresh coordination, and the
//! authenticated client every feature module calls through.

pub mod client;
pub mod envelope;
pub mod file_urls;
pub mod refresh;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use envelope::{ApiRequest, Attachment, AuthMode, MultipartForm, RequestBody};
pub use transport::{RawResponse, ReqwestTransport, Transport};

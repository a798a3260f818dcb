//! MissionLink client library.
//!
//! ARCHITECTURE
//! ============
//! `net` is the authenticated request client (envelopes, transport, token
//! refresh, retry). `session` keeps the signed-in token/user pair and its
//! durable copy. `services` map API areas onto typed calls, and `state`
//! holds what a front end keeps between calls. `contact` and `catalog` are
//! pure helpers.
//!
//! One [`ApiClient`] is the whole session context: construct it once and
//! clone the handle wherever a call is made.

pub mod catalog;
pub mod config;
pub mod contact;
pub mod error;
pub mod net;
pub mod services;
pub mod session;
pub mod state;
pub mod types;

pub use config::ClientConfig;
pub use error::ApiError;
pub use net::ApiClient;
pub use session::{Session, SessionUser};

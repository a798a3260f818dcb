//! Feature services over the authenticated client.
//!
//! ARCHITECTURE
//! ============
//! Each module maps one area of the API onto typed calls through
//! [`crate::net::ApiClient`]. Services own request shapes and response
//! decoding; the `state` modules own what a front end keeps between calls.

pub mod auth;
pub mod countries;
pub mod dashboard;
pub mod me;
pub mod reports;

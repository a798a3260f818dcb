//! Wire DTOs for the MissionLink API.
//!
//! Every optional field defaults so older servers (and sparse seed data)
//! still decode.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /api/auth/login` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub role: String,
}

// =============================================================================
// ACCOUNT
// =============================================================================

/// `GET /api/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Me {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub missionary: Option<MissionaryProfile>,
}

/// The missionary half of an account. Accounts without one are plain users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionaryProfile {
    pub id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub assigned_iso2: Vec<String>,
}

/// `PUT /api/me/profile` body. All fields are sent, empty when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub email: String,
    pub avatar_url: String,
    pub bio: String,
    pub website: String,
}

/// `POST /api/me/avatar` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AvatarUploaded {
    #[serde(default)]
    pub message: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentsUpdate<'a> {
    pub countries: &'a [String],
}

/// `PUT /api/me/assignments` response. `countries` is the server-normalized list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssignmentsSaved {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub countries: Option<Vec<String>>,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportImage {
    #[serde(default)]
    pub id: Option<i64>,
    pub url: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// One of the signed-in missionary's own reports (`GET /api/me/reports`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// ISO 8601 timestamp as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_mime: Option<String>,
    #[serde(default)]
    pub images: Vec<ReportImage>,
}

/// A report as listed on a country (`GET /api/countries/{iso2}/reports`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryReport {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Author display name.
    #[serde(default)]
    pub missionary: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_mime: Option<String>,
    #[serde(default)]
    pub images: Vec<ReportImage>,
}

/// `POST /api/me/reports` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedReport {
    #[serde(default)]
    pub message: String,
    pub id: i64,
}

// =============================================================================
// LIST ENVELOPES
// =============================================================================

/// A list endpoint that answers with either a bare array or `{ "<key>": [...] }`.
///
/// Anything else (missing key, non-array) reads as an empty list.
#[must_use]
pub fn unwrap_list(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

//! The side panel shown for one country on the map.
//!
//! DESIGN
//! ======
//! Missionaries and reports load independently, so each list is its own
//! [`Section`]. A failure in one leaves the other intact; whichever finishes
//! first is shown first.

#[cfg(test)]
#[path = "country_panel_test.rs"]
mod country_panel_test;

use serde::Serialize;
use serde_json::Value;

use crate::catalog;
use crate::contact::{extract_email, extract_website, url_label};
use crate::net::file_urls::to_backend_url;
use crate::types::CountryReport;

/// Reports listed in the panel.
pub const RECENT_REPORTS_SHOWN: usize = 6;

/// Characters of report text shown before the excerpt is cut.
pub const EXCERPT_CHARS: usize = 180;

/// Load state of one list in the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Pending,
    Ready(Vec<T>),
    /// Human-readable failure text.
    Failed(String),
}

impl<T> Section<T> {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Items when ready; empty while pending or after a failure.
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            Self::Pending | Self::Failed(_) => &[],
        }
    }
}

/// One missionary as the panel renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissionaryCard {
    pub display_name: String,
    pub organization: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub website_label: Option<String>,
    pub avatar_url: Option<String>,
}

impl MissionaryCard {
    /// Build a card from a raw missionary record. `base_url` resolves the avatar.
    #[must_use]
    pub fn from_value(value: &Value, base_url: &str) -> Self {
        let email = extract_email(value);
        let website = extract_website(value);
        let display_name = ["name", "full_name", "display_name"]
            .iter()
            .filter_map(|key| non_empty(value, key))
            .next()
            .or_else(|| email.clone())
            .unwrap_or_else(|| "Unnamed".to_owned());
        let avatar_url = non_empty(value, "avatar_url")
            .map(|raw| to_backend_url(base_url, &raw))
            .filter(|url| !url.is_empty());

        Self {
            display_name,
            organization: non_empty(value, "organization"),
            bio: non_empty(value, "bio"),
            website_label: website.as_deref().map(url_label),
            email,
            website,
            avatar_url,
        }
    }
}

fn non_empty(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Everything the panel shows for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryPanel {
    pub name: String,
    pub iso2: String,
    pub missionaries: Section<MissionaryCard>,
    pub reports: Section<CountryReport>,
    /// True while missing contact details are being looked up.
    pub hydrating: bool,
}

impl CountryPanel {
    /// A panel with both sections pending. `iso2` must already be normalized.
    #[must_use]
    pub fn pending(iso2: &str) -> Self {
        Self {
            name: catalog::name_for_iso2(iso2).unwrap_or(iso2).to_owned(),
            iso2: iso2.to_owned(),
            missionaries: Section::Pending,
            reports: Section::Pending,
            hydrating: false,
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.missionaries.is_settled() && self.reports.is_settled() && !self.hydrating
    }

    /// The reports the panel lists, newest first as served.
    #[must_use]
    pub fn recent_reports(&self) -> &[CountryReport] {
        let reports = self.reports.items();
        &reports[..reports.len().min(RECENT_REPORTS_SHOWN)]
    }
}

/// `text` cut to `max_chars` characters with an ellipsis when shortened.
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

//! Contact details pulled out of loosely-shaped missionary payloads.
//!
//! DESIGN
//! ======
//! Missionary records come from several endpoints and seed scripts, and the
//! email/website can sit at the top level, under `user`/`profile`/`missionary`,
//! or deeper. Extraction checks an explicit list of known paths first, then
//! falls back to a bounded walk of the whole value. Everything here is pure.

#[cfg(test)]
#[path = "contact_test.rs"]
mod contact_test;

use reqwest::Url;
use serde_json::Value;

/// How deep the fallback walks go below the root value.
pub const MAX_SEARCH_DEPTH: usize = 6;

const EMAIL_PATHS: &[&[&str]] = &[
    &["email"],
    &["contact_email"],
    &["preferred_email"],
    &["primary_email"],
    &["user", "email"],
    &["profile", "email"],
    &["missionary", "email"],
];

const WEBSITE_PATHS: &[&[&str]] = &[
    &["website"],
    &["url"],
    &["link"],
    &["profile", "website"],
    &["missionary", "website"],
];

const WEBSITE_KEY_HINTS: &[&str] = &["site", "url", "link", "web"];

// =============================================================================
// EMAIL
// =============================================================================

/// Loose `local@domain.tld` check: no whitespace, one `@`, a dot inside the domain.
#[must_use]
pub fn looks_like_email(s: &str) -> bool {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Best email address in `value`, or `None`.
#[must_use]
pub fn extract_email(value: &Value) -> Option<String> {
    let listed = value
        .get("emails")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            other => other
                .get("address")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| other.get("email").and_then(Value::as_str)),
        });

    EMAIL_PATHS
        .iter()
        .filter_map(|path| lookup(value, path).and_then(Value::as_str))
        .chain(listed)
        .map(str::trim)
        .find(|s| looks_like_email(s))
        .map(str::to_owned)
        .or_else(|| deep_find_email(value))
}

/// Walk `value` for any email-shaped string. A match under a key containing
/// "email" replaces an earlier match found elsewhere.
fn deep_find_email(value: &Value) -> Option<String> {
    let mut best = None;
    visit_for_email(value, 0, "", &mut best);
    best
}

fn visit_for_email(node: &Value, depth: usize, key_hint: &str, best: &mut Option<String>) {
    if depth > MAX_SEARCH_DEPTH {
        return;
    }
    match node {
        Value::String(s) => {
            let s = s.trim();
            if looks_like_email(s) && (best.is_none() || key_hint.to_ascii_lowercase().contains("email")) {
                *best = Some(s.to_owned());
            }
        }
        Value::Array(items) => {
            for item in items {
                visit_for_email(item, depth + 1, key_hint, best);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                visit_for_email(child, depth + 1, key, best);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

// =============================================================================
// WEBSITE
// =============================================================================

/// Best website link in `value`, normalized with [`clean_url`].
#[must_use]
pub fn extract_website(value: &Value) -> Option<String> {
    WEBSITE_PATHS
        .iter()
        .filter_map(|path| lookup(value, path).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .and_then(clean_url)
        .or_else(|| deep_find_website(value))
}

/// Depth-first search for a non-empty string under a website-ish key.
/// Avatar keys are skipped: they hold image paths, not homepages.
fn deep_find_website(value: &Value) -> Option<String> {
    let mut stack = vec![(value, 0_usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_SEARCH_DEPTH {
            continue;
        }
        match node {
            Value::Object(map) => {
                for (key, child) in map {
                    match child {
                        Value::String(s) if !s.trim().is_empty() && is_website_key(key) => return clean_url(s),
                        Value::Object(_) | Value::Array(_) => stack.push((child, depth + 1)),
                        _ => {}
                    }
                }
            }
            Value::Array(items) => {
                stack.extend(items.iter().filter(|v| v.is_object() || v.is_array()).map(|v| (v, depth + 1)));
            }
            _ => {}
        }
    }
    None
}

fn is_website_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    !key.contains("avatar") && WEBSITE_KEY_HINTS.iter().any(|hint| key.contains(hint))
}

// =============================================================================
// URL HELPERS
// =============================================================================

/// Make a bare host like `example.org` clickable by adding `https://`.
#[must_use]
pub fn clean_url(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let lower = s.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(s.to_owned());
    }
    Some(format!("https://{}", s.trim_start_matches('/')))
}

/// Short display label for a link: the host without `www.`.
#[must_use]
pub fn url_label(raw: &str) -> String {
    let parsed = clean_url(raw).and_then(|u| Url::parse(&u).ok());
    if let Some(host) = parsed.as_ref().and_then(Url::host_str) {
        return host.strip_prefix("www.").unwrap_or(host).to_owned();
    }
    let s = raw.trim();
    let lower = s.to_ascii_lowercase();
    let s = if lower.starts_with("https://") {
        &s[8..]
    } else if lower.starts_with("http://") {
        &s[7..]
    } else {
        s
    };
    s.strip_prefix("www.").unwrap_or(s).trim_end_matches('/').to_owned()
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Ids a missionary record can be looked up by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactIds {
    pub missionary_id: Option<String>,
    pub user_id: Option<String>,
}

impl ContactIds {
    /// `missionary_id`, `id`, or `missionary.id`; and `user_id` or `user.id`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        Self { missionary_id: first_id(value, MISSIONARY_ID_PATHS), user_id: first_id(value, USER_ID_PATHS) }
    }

    /// Detail endpoint and cache key, preferring the missionary record.
    #[must_use]
    pub fn detail_lookup(&self) -> Option<(String, String)> {
        if let Some(id) = &self.missionary_id {
            return Some((format!("/api/missionaries/{id}"), format!("m:{id}")));
        }
        self.user_id
            .as_ref()
            .map(|id| (format!("/api/users/{id}"), format!("u:{id}")))
    }
}

const MISSIONARY_ID_PATHS: &[&[&str]] = &[&["missionary_id"], &["id"], &["missionary", "id"]];
const USER_ID_PATHS: &[&[&str]] = &[&["user_id"], &["user", "id"]];

fn first_id(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| lookup(value, path).and_then(id_string))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        _ => None,
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(*key))
}

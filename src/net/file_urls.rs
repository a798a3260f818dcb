//! Resolve server-relative file URLs (avatars, report images, attachments).
//!
//! Uploaded files have been served from a few legacy prefixes over time;
//! everything is rewritten onto the public `/api/files/` route.

#[cfg(test)]
#[path = "file_urls_test.rs"]
mod file_urls_test;

use super::envelope::{has_scheme, join_url};

const FILES_PREFIX: &str = "/api/files/";

/// Turn a stored file URL into one the client can fetch.
///
/// Empty input yields an empty string; absolute URLs pass through.
#[must_use]
pub fn to_backend_url(base: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if has_scheme(raw) {
        return raw.to_owned();
    }

    let path = rewrite_legacy(&if raw.starts_with('/') { raw.to_owned() } else { format!("/{raw}") });

    let base = base.trim();
    if base.is_empty() {
        return path;
    }

    if has_scheme(base) {
        let origin = base.trim_end_matches('/');
        let origin = strip_suffix_ignore_case(origin, "/api").unwrap_or(origin);
        return join_url(origin, &path);
    }

    let base_path = if base.starts_with('/') { base.to_owned() } else { format!("/{base}") };
    let base_path = base_path.trim_end_matches('/');
    if path == base_path || path.starts_with(&format!("{base_path}/")) {
        return path;
    }
    if base_path == "/api" && path.starts_with("/api/") {
        return path;
    }
    format!("{base_path}{path}")
}

fn rewrite_legacy(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/api/uploads/") {
        format!("{FILES_PREFIX}{rest}")
    } else if let Some(rest) = path.strip_prefix("/uploads/") {
        format!("{FILES_PREFIX}{rest}")
    } else if let Some(rest) = path.strip_prefix("/api/upload") {
        format!("/api/files{rest}")
    } else {
        path.to_owned()
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

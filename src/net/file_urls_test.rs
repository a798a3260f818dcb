use super::*;

#[test]
fn empty_input_is_empty() {
    assert_eq!(to_backend_url("http://h", "   "), "");
}

#[test]
fn absolute_url_passes_through() {
    assert_eq!(to_backend_url("http://h", "https://cdn.test/a.png"), "https://cdn.test/a.png");
}

#[test]
fn legacy_uploads_prefix_is_rewritten() {
    assert_eq!(to_backend_url("", "/uploads/a.png"), "/api/files/a.png");
    assert_eq!(to_backend_url("", "uploads/a.png"), "/api/files/a.png");
    assert_eq!(to_backend_url("", "/api/uploads/b.pdf"), "/api/files/b.pdf");
    assert_eq!(to_backend_url("", "/api/upload/c.jpg"), "/api/files/c.jpg");
}

#[test]
fn current_files_path_is_kept() {
    assert_eq!(to_backend_url("", "/api/files/a.png"), "/api/files/a.png");
}

#[test]
fn absolute_base_strips_trailing_api() {
    assert_eq!(to_backend_url("https://x.org/api/", "/uploads/a.png"), "https://x.org/api/files/a.png");
    assert_eq!(to_backend_url("https://x.org/API", "/api/files/a.png"), "https://x.org/api/files/a.png");
    assert_eq!(to_backend_url("https://x.org", "/other/a.png"), "https://x.org/other/a.png");
}

#[test]
fn relative_base_is_not_doubled() {
    assert_eq!(to_backend_url("/api", "/api/files/a.png"), "/api/files/a.png");
    assert_eq!(to_backend_url("api", "/static/a.png"), "/api/static/a.png");
    assert_eq!(to_backend_url("/v2", "/v2/x.png"), "/v2/x.png");
}

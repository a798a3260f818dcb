use super::*;

// =============================================================================
// join_url
// =============================================================================

#[test]
fn absolute_path_is_returned_unchanged() {
    let url = "https://cdn.example.org/api/api/files/a.png";
    assert_eq!(join_url("https://api.example.org", url), url);
    assert_eq!(join_url("", url), url);
}

#[test]
fn absolute_detection_is_case_insensitive() {
    assert_eq!(join_url("http://base", "HTTPS://Other/x"), "HTTPS://Other/x");
}

#[test]
fn empty_base_keeps_relative_path() {
    assert_eq!(join_url("", "/api/me"), "/api/me");
    assert_eq!(join_url("  ", "/api/api/x"), "/api/api/x");
}

#[test]
fn base_and_path_join_with_single_slash() {
    assert_eq!(join_url("http://h:5001", "/api/me"), "http://h:5001/api/me");
    assert_eq!(join_url("http://h:5001/", "api/me"), "http://h:5001/api/me");
    assert_eq!(join_url("http://h:5001///", "//api/me"), "http://h:5001/api/me");
}

#[test]
fn base_ending_in_api_does_not_duplicate_prefix() {
    assert_eq!(join_url("https://x.org/api", "/api/me/reports"), "https://x.org/api/me/reports");
    assert_eq!(join_url("https://x.org/api/", "/api/api/me"), "https://x.org/api/me");
}

#[test]
fn relative_api_base_collapses() {
    assert_eq!(join_url("/api", "/api/me"), "/api/me");
}

#[test]
fn api_lookalike_segments_are_kept() {
    assert_eq!(join_url("https://x.org/api", "/apiary/api"), "https://x.org/api/apiary/api");
}

#[test]
fn query_string_is_untouched() {
    assert_eq!(join_url("https://x.org/api", "/api/search?q=api/api"), "https://x.org/api/search?q=api/api");
}

#[test]
fn no_joined_url_contains_double_api() {
    let bases = ["", "http://h", "http://h/", "http://h/api", "http://h/api/", "/api", "https://h/v1/api"];
    let paths = ["/api/me", "api/me", "/api/api/me", "/me", "/api", "api/api", "/x/api/api/y"];
    for base in bases {
        for path in paths {
            let url = join_url(base, path);
            assert!(!url.contains("/api/api"), "{base:?} + {path:?} -> {url}");
            assert!(!url.starts_with("api/api"), "{base:?} + {path:?} -> {url}");
        }
    }
}

#[test]
fn has_scheme_rejects_plain_paths() {
    assert!(has_scheme("http://a"));
    assert!(has_scheme("custom+x://a"));
    assert!(!has_scheme("/api/x"));
    assert!(!has_scheme("://nothing"));
    assert!(!has_scheme("1http://a"));
}

// =============================================================================
// build_envelope
// =============================================================================

#[test]
fn json_body_is_serialized_with_content_type() {
    let request = ApiRequest::put("/api/me/profile")
        .with_json(&serde_json::json!({ "bio": "hi" }))
        .unwrap();
    let envelope = build_envelope("http://h", &request, Some("T1"));
    assert_eq!(envelope.url, "http://h/api/me/profile");
    assert_eq!(envelope.payload, Payload::Json(r#"{"bio":"hi"}"#.to_owned()));
    assert_eq!(envelope.content_type(), Some("application/json"));
    assert_eq!(envelope.bearer.as_deref(), Some("T1"));
}

#[test]
fn multipart_body_leaves_content_type_to_transport() {
    let form = MultipartForm::new().text("title", "Update");
    let request = ApiRequest::post("/api/me/reports").with_form(form.clone());
    let envelope = build_envelope("", &request, None);
    assert_eq!(envelope.payload, Payload::Multipart(form));
    assert_eq!(envelope.content_type(), None);
}

#[test]
fn anonymous_calls_never_carry_token() {
    let request = ApiRequest::post("/api/auth/login").anonymous();
    let envelope = build_envelope("", &request, Some("T1"));
    assert_eq!(envelope.bearer, None);
}

#[test]
fn empty_token_is_not_sent() {
    let envelope = build_envelope("", &ApiRequest::get("/api/me"), Some(""));
    assert_eq!(envelope.bearer, None);
}

// =============================================================================
// MultipartForm / Attachment
// =============================================================================

#[test]
fn form_lookup_helpers() {
    let png = Attachment::new("a.png", "image/png", vec![1, 2]);
    let jpg = Attachment::new("b.jpg", "image/jpeg", vec![3]);
    let form = MultipartForm::new()
        .text("title", "Hello")
        .file("images", png.clone())
        .file("images", jpg.clone());
    assert_eq!(form.text_value("title"), Some("Hello"));
    assert_eq!(form.text_value("content"), None);
    assert_eq!(form.files("images"), vec![&png, &jpg]);
    assert!(form.files("file").is_empty());
}

#[test]
fn mime_guess_by_extension() {
    assert_eq!(mime_for_path(Path::new("x/photo.JPG")), "image/jpeg");
    assert_eq!(mime_for_path(Path::new("report.pdf")), "application/pdf");
    assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
}

#[test]
fn attachment_debug_hides_bytes() {
    let a = Attachment::new("a.pdf", "application/pdf", vec![0; 4096]);
    let rendered = format!("{a:?}");
    assert!(rendered.contains("len: 4096"));
    assert!(!rendered.contains("0, 0, 0"));
}

#[test]
fn attachment_from_path_reads_file() {
    let path = std::env::temp_dir().join(format!("ml-attach-{}.png", uuid::Uuid::new_v4()));
    std::fs::write(&path, [137, 80, 78, 71]).unwrap();
    let attachment = Attachment::from_path(&path).unwrap();
    assert_eq!(attachment.mime, "image/png");
    assert_eq!(attachment.bytes, vec![137, 80, 78, 71]);
    assert!(attachment.is_image());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn attachment_from_missing_path_is_invalid() {
    let err = Attachment::from_path(Path::new("/definitely/not/here.pdf")).unwrap_err();
    assert!(matches!(err, ApiError::Invalid(_)));
}

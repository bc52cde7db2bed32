//! Template rendering integration tests.
//!
//! Tests verify:
//! - Default data, overrides and the shallow merge between them
//! - Error precedence (unknown template before body validation)
//! - Download filename format
//! - The template's `data.json` on disk is never modified
//! - Concurrent requests never see each other's data

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use typst_render_server::{
    create_router, CompileJob, FontCache, RouterConfig, TemplateStore, TypstEngine,
};

use super::test_utils::{
    body_bytes, body_json, echoed_json, is_pdf, EchoEngine, TemplateDir, GREETING_TEMPLATE,
    MOCK_PDF_HEADER,
};

fn echo_router(engine: EchoEngine, templates: &TemplateDir) -> axum::Router {
    create_router(
        engine,
        TemplateStore::new(templates.path()),
        RouterConfig::without_auth(),
    )
}

fn template_request(name: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/template/{}", name))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

// =============================================================================
// Data Merging
// =============================================================================

#[tokio::test]
async fn test_overrides_merged_over_defaults() {
    let templates =
        TemplateDir::new().with_template("report", "Hi", Some(r#"{"a": 1, "b": 2}"#));
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("report", r#"{"b": 3, "c": 4}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = echoed_json(&body_bytes(response).await);
    assert_eq!(data, json!({"a": 1, "b": 3, "c": 4}));
}

#[tokio::test]
async fn test_merged_data_keeps_key_order() {
    let templates =
        TemplateDir::new().with_template("report", "Hi", Some(r#"{"zeta": 1, "alpha": 2}"#));
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("report", r#"{"mid": 3}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let data = String::from_utf8(body[MOCK_PDF_HEADER.len()..].to_vec()).unwrap();

    // Defaults first in file order, then new request keys
    let zeta = data.find("\"zeta\"").unwrap();
    let alpha = data.find("\"alpha\"").unwrap();
    let mid = data.find("\"mid\"").unwrap();
    assert!(zeta < alpha && alpha < mid, "unexpected key order in {data}");

    let keys: Vec<String> = echoed_json(&body)
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys, ["zeta", "alpha", "mid"]);
}

#[tokio::test]
async fn test_merge_is_shallow() {
    let templates = TemplateDir::new().with_template(
        "invoice",
        "Hi",
        Some(r#"{"customer": {"name": "Ada", "city": "London"}, "total": 10}"#),
    );
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request(
            "invoice",
            r#"{"customer": {"name": "Grace"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = echoed_json(&body_bytes(response).await);
    assert_eq!(data, json!({"customer": {"name": "Grace"}, "total": 10}));
}

#[tokio::test]
async fn test_empty_body_uses_defaults() {
    let templates =
        TemplateDir::new().with_template("report", "Hi", Some(r#"{"title": "Q3"}"#));
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("report", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = echoed_json(&body_bytes(response).await);
    assert_eq!(data, json!({"title": "Q3"}));
}

#[tokio::test]
async fn test_missing_defaults_uses_overrides_only() {
    let templates = TemplateDir::new().with_template("letter", "Hi", None);
    let engine = EchoEngine::new();
    let router = echo_router(engine.clone(), &templates);

    let response = router
        .oneshot(template_request("letter", r#"{"to": "Ada"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = echoed_json(&body_bytes(response).await);
    assert_eq!(data, json!({"to": "Ada"}));

    // The job compiles inside the template's own directory
    let jobs = engine.jobs();
    assert_eq!(jobs.len(), 1);
    match &jobs[0] {
        CompileJob::Template { root, shadow } => {
            assert_eq!(root, &templates.path().join("letter"));
            assert_eq!(shadow.as_ref().unwrap().path, "/data.json");
        }
        other => panic!("expected template job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_defaults_on_disk_unchanged() {
    let defaults = r#"{"a": 1}"#;
    let templates = TemplateDir::new().with_template("report", "Hi", Some(defaults));
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("report", r#"{"a": 2, "b": 3}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let on_disk = std::fs::read_to_string(templates.path().join("report/data.json")).unwrap();
    assert_eq!(on_disk, defaults);
}

// =============================================================================
// Validation Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_template_not_found() {
    let templates = TemplateDir::new();
    let engine = EchoEngine::new();
    let router = echo_router(engine.clone(), &templates);

    let response = router
        .oneshot(template_request("nope", r#"{"a": 1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Template 'nope' not found");
    assert_eq!(json["code"], "template_not_found");
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn test_unknown_template_wins_over_bad_body() {
    let templates = TemplateDir::new();
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("nope", "[1, 2, 3]"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directory_without_main_not_found() {
    let templates = TemplateDir::new();
    std::fs::create_dir(templates.path().join("empty")).unwrap();
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("empty", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_array_body_rejected() {
    let templates = TemplateDir::new().with_template("report", "Hi", None);
    let engine = EchoEngine::new();
    let router = echo_router(engine.clone(), &templates);

    let response = router
        .oneshot(template_request("report", "[1, 2]"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "invalid_body");
    assert!(engine.jobs().is_empty());
}

#[tokio::test]
async fn test_scalar_bodies_rejected() {
    let templates = TemplateDir::new().with_template("report", "Hi", None);

    for body in [r#""text""#, "42", "null", "true"] {
        let router = echo_router(EchoEngine::new(), &templates);
        let response = router
            .oneshot(template_request("report", body))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "body {body} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let templates = TemplateDir::new().with_template("report", "Hi", None);
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("report", "{\"a\": "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "invalid_json");
}

#[tokio::test]
async fn test_traversal_name_rejected() {
    let templates = TemplateDir::new().with_template("report", "Hi", None);
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("..%2Freport", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "invalid_template_name");
}

#[tokio::test]
async fn test_invalid_defaults_is_server_error() {
    let templates = TemplateDir::new().with_template("broken", "Hi", Some("{oops"));
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("broken", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to generate PDF from template");
}

#[tokio::test]
async fn test_compile_failure_is_generic() {
    let templates = TemplateDir::new().with_template("report", "Hi", None);
    let router = echo_router(EchoEngine::failing(), &templates);

    let response = router
        .oneshot(template_request("report", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to generate PDF from template");
    assert!(!json.to_string().contains("secret.typ"));
}

// =============================================================================
// Response Headers
// =============================================================================

#[tokio::test]
async fn test_download_filename() {
    let templates = TemplateDir::new().with_template("invoice", "Hi", None);
    let router = echo_router(EchoEngine::new(), &templates);

    let response = router
        .oneshot(template_request("invoice", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    let filename = disposition
        .strip_prefix("attachment; filename=invoice_")
        .unwrap();
    let timestamp = filename.strip_suffix(".pdf").unwrap();

    // YYYY-MM-DDTHH-MM-SS-mmmZ
    assert_eq!(timestamp.len(), 24, "unexpected timestamp {timestamp}");
    assert_eq!(&timestamp[10..11], "T");
    assert!(timestamp.ends_with('Z'));
    assert!(!timestamp.contains(':'));
    assert!(!timestamp.contains('.'));
}

// =============================================================================
// Real Compilation
// =============================================================================

#[tokio::test]
async fn test_real_template_render() {
    let templates = TemplateDir::new()
        .with_template(
            "greeting",
            &format!("#include \"footer.typ\"\n{}", GREETING_TEMPLATE),
            Some(r#"{"name": "World", "count": 2}"#),
        )
        .with_file("greeting", "footer.typ", b"_Generated by the render server_");

    let router = create_router(
        TypstEngine::new(FontCache::new()),
        TemplateStore::new(templates.path()),
        RouterConfig::without_auth(),
    );

    let response = router
        .oneshot(template_request("greeting", r#"{"name": "Ada"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert!(is_pdf(&body), "Response should be a PDF");
}

#[tokio::test]
async fn test_real_template_missing_field_fails() {
    let templates = TemplateDir::new().with_template("greeting", GREETING_TEMPLATE, None);

    let router = create_router(
        TypstEngine::default(),
        TemplateStore::new(templates.path()),
        RouterConfig::without_auth(),
    );

    // `name` is neither a default nor an override
    let response = router
        .oneshot(template_request("greeting", r#"{"other": 1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Isolation
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_isolated() {
    let templates =
        TemplateDir::new().with_template("report", "Hi", Some(r#"{"shared": true}"#));
    let router = echo_router(EchoEngine::new(), &templates);

    let mut handles = Vec::new();
    for i in 0..32 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let body = json!({ format!("key_{i}"): i }).to_string();
            let response = router
                .oneshot(template_request("report", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            (i, echoed_json(&body_bytes(response).await))
        }));
    }

    for handle in handles {
        let (i, data) = handle.await.unwrap();
        let mut expected = serde_json::Map::new();
        expected.insert("shared".to_string(), json!(true));
        expected.insert(format!("key_{i}"), json!(i));
        assert_eq!(data, serde_json::Value::Object(expected));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_real_renders() {
    let templates = TemplateDir::new().with_template(
        "greeting",
        GREETING_TEMPLATE,
        Some(r#"{"name": "World"}"#),
    );
    let router = create_router(
        TypstEngine::default(),
        TemplateStore::new(templates.path()),
        RouterConfig::without_auth(),
    );

    let mut handles = Vec::new();
    for i in 0..4 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let body = json!({ "name": format!("Reader {i}") }).to_string();
            router
                .oneshot(template_request("greeting", body))
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(is_pdf(&body_bytes(response).await));
    }
}

#[tokio::test]
async fn test_bundled_invoice_template() {
    let router = create_router(
        TypstEngine::default(),
        TemplateStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")),
        RouterConfig::without_auth(),
    );

    let body = json!({
        "number": "2024-042",
        "customer": {"name": "Ada Lovelace", "address": "12 St James's Square"},
    })
    .to_string();

    let response = router
        .oneshot(template_request("invoice", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(is_pdf(&body_bytes(response).await));
}

//! Wiremock integration tests for the HTTP wizards backend.
#![cfg(feature = "http")]

use std::sync::Arc;
use std::time::Duration;

use augur::backend::HttpBackend;
use augur::config::Config;
use augur::{
    AnalysisContext, AnalyzeOptions, AnalyzerBackend, AugurError, LifecycleManager,
    LifecycleState, Severity, SourceFile, StaticAnalyzerRegistry,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_wizard_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/wizards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "2.1.0",
            "wizards": [{ "id": "security" }, { "id": "performance" }]
        })))
        .mount(server)
        .await;
}

async fn started_backend(server: &MockServer) -> HttpBackend {
    mount_wizard_list(server).await;
    let backend = HttpBackend::with_base_url(server.uri()).unwrap();
    backend.start().await.expect("start should succeed");
    backend
}

#[tokio::test]
async fn start_lists_wizards_as_capabilities() {
    let server = MockServer::start().await;
    mount_wizard_list(&server).await;

    let backend = HttpBackend::with_base_url(server.uri()).unwrap();
    assert!(!backend.is_connected());

    let init = backend.start().await.unwrap();
    assert!(backend.is_connected());
    assert_eq!(init.version.as_deref(), Some("2.1.0"));
    assert_eq!(init.capabilities, vec!["security", "performance"]);

    backend.stop().await.unwrap();
    assert!(!backend.is_connected());
}

#[tokio::test]
async fn analyze_posts_code_and_parses_findings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/security/analyze"))
        .and(body_partial_json(json!({
            "code": "eval(x)",
            "file_path": "app.py",
            "role": "developer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "wizard": "security",
            "result": {
                "summary": "1 issue",
                "findings": [
                    { "severity": "error", "message": "eval on user input", "line": 1, "rule": "S307" }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let backend = started_backend(&server).await;

    let output = backend
        .run_analyzer(
            "security",
            "eval(x)",
            "app.py",
            &AnalyzeOptions::new().role("developer"),
        )
        .await
        .unwrap();

    assert_eq!(output.payload["summary"], "1 issue");
    assert_eq!(output.findings.len(), 1);
    assert_eq!(output.findings[0].severity, Severity::Error);
    assert_eq!(output.findings[0].rule.as_deref(), Some("S307"));
}

#[tokio::test]
async fn configured_route_reaches_wizard_action() {
    let server = MockServer::start().await;
    mount_wizard_list(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/security/scan-snippet"))
        .and(body_partial_json(json!({ "code": "eval(x)" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "wizard": "Security Analysis Wizard",
            "result": { "findings": [{ "severity": "error", "message": "eval" }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.backend.url = server.uri();
    config
        .backend
        .routes
        .insert("security".to_string(), "security/scan-snippet".to_string());
    let backend = HttpBackend::from_config(&config.backend).unwrap();
    backend.start().await.unwrap();

    let output = backend
        .run_analyzer("security", "eval(x)", "app.py", &AnalyzeOptions::default())
        .await
        .unwrap();
    assert_eq!(output.findings.len(), 1);
}

#[tokio::test]
async fn unsuccessful_wizard_maps_to_analyzer_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/performance/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "model quota exceeded"
        })))
        .mount(&server)
        .await;
    let backend = started_backend(&server).await;

    let err = backend
        .run_analyzer("performance", "x", "a.py", &AnalyzeOptions::default())
        .await
        .unwrap_err();
    match err {
        AugurError::Analyzer { analyzer, message } => {
            assert_eq!(analyzer, "performance");
            assert_eq!(message, "model quota exceeded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn http_status_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/missing/analyze"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/security/analyze"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let backend = started_backend(&server).await;

    let not_found = backend
        .run_analyzer("missing", "x", "a.py", &AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(not_found, AugurError::Analyzer { .. }));

    let server_error = backend
        .run_analyzer("security", "x", "a.py", &AnalyzeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(server_error, AugurError::Api { status: 500, .. }));
}

#[tokio::test]
async fn multi_review_returns_per_wizard_outputs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/multi"))
        .and(body_partial_json(json!({
            "wizards": ["performance", "security"],
            "scenario": "pre-release"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "verdict": "ship it" },
            "wizards": {
                "performance": { "findings": [] },
                "security": { "findings": [{ "severity": "warning", "message": "weak hash" }] }
            }
        })))
        .mount(&server)
        .await;
    let backend = started_backend(&server).await;

    let combined = backend
        .run_multi_analyzer(
            &["performance".to_string(), "security".to_string()],
            "x",
            "a.py",
            "pre-release",
            &AnalysisContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(combined.payload["verdict"], "ship it");
    assert_eq!(combined.analyzers.len(), 2);
    assert_eq!(combined.analyzers["security"].findings.len(), 1);
}

#[tokio::test]
async fn health_check_parses_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy", "version": "2.1.0" })),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::with_base_url(server.uri()).unwrap();
    let health = backend.health_check().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.version.as_deref(), Some("2.1.0"));
}

#[tokio::test]
async fn unreachable_service_is_backend_unavailable() {
    // Nothing listens on the discard port.
    let backend = HttpBackend::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = backend.start().await.unwrap_err();
    assert!(matches!(err, AugurError::BackendUnavailable(_)));
    assert!(!backend.is_connected());
}

#[tokio::test]
async fn lifecycle_over_http_reports_healthy_backend() {
    let server = MockServer::start().await;
    mount_wizard_list(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/wizards/security/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "findings": [] }
        })))
        // Second analysis of the same content is a cache hit.
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.backend.url = server.uri();
    let manager = LifecycleManager::new(
        Arc::new(HttpBackend::from_config(&config.backend).unwrap()),
        Arc::new(StaticAnalyzerRegistry::with_defaults()),
        Arc::new(config),
    );

    assert_eq!(manager.initialize().await, LifecycleState::Ready);
    assert!(manager.health_check().await.overall_healthy);

    let file = SourceFile::new("app.py", "python", "x = 1");
    for _ in 0..2 {
        manager
            .coordinator()
            .analyze_with_analyzer(&file, "security", &AnalyzeOptions::default())
            .await
            .unwrap();
    }
    manager.dispose().await;
}

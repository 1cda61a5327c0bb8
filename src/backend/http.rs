//! HTTP client for a wizards REST service.
//!
//! Endpoints used:
//! - `GET  /api/health` - liveness and version
//! - `GET  /api/v1/wizards` - available wizards (used as the start handshake)
//! - `POST /api/v1/wizards/{route}` - run one wizard
//! - `POST /api/v1/wizards/multi` - collaborative multi-wizard review
//!
//! A wizard's route defaults to `{id}/analyze`. Services whose wizards expose
//! their own action names (`security/scan-snippet`, `code-review/review`)
//! are reached by registering routes, see [`HttpBackend::with_route`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::traits::AnalyzerBackend;
use crate::types::{
    AnalysisContext, AnalyzeOptions, AnalyzerOutput, BackendHealth, CombinedOutput, Finding,
    InitResult,
};
use crate::{AugurError, Result};

/// Default base URL for a locally running wizards service.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout. Analyses call an LLM, so this is generous.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// [`AnalyzerBackend`] that talks to a wizards service over HTTP.
///
/// `start` performs a handshake (lists the service's wizards); analysis
/// calls made before a successful `start`, or after `stop`, fail with
/// [`AugurError::BackendUnavailable`].
pub struct HttpBackend {
    http: Client,
    base_url: String,
    routes: BTreeMap<String, String>,
    connected: AtomicBool,
}

impl HttpBackend {
    /// Client for the default local service.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AugurError::Http(format!("failed to build HTTP client: {e}")))?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            routes: BTreeMap::new(),
            connected: AtomicBool::new(false),
        })
    }

    /// Build from the `[backend]` config section.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let mut backend =
            Self::with_timeout(&config.url, Duration::from_secs(config.timeout_secs))?;
        for (analyzer_id, route) in &config.routes {
            backend = backend.with_route(analyzer_id, route);
        }
        Ok(backend)
    }

    /// Send `analyzer_id` requests to `/api/v1/wizards/{route}` instead of
    /// the default `{id}/analyze`.
    pub fn with_route(mut self, analyzer_id: impl Into<String>, route: &str) -> Self {
        self.routes
            .insert(analyzer_id.into(), route.trim_matches('/').to_string());
        self
    }

    /// Full URL for running `analyzer_id`.
    pub fn analyze_url(&self, analyzer_id: &str) -> String {
        match self.routes.get(analyzer_id) {
            Some(route) => format!("{}/api/v1/wizards/{}", self.base_url, route),
            None => format!("{}/api/v1/wizards/{}/analyze", self.base_url, analyzer_id),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(AugurError::BackendUnavailable(format!(
                "not connected to {}",
                self.base_url
            )))
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        analyzer: &str,
    ) -> Result<WizardResponse> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        handle_response_errors(&response, analyzer)?;

        let body: WizardResponse = response
            .json()
            .await
            .map_err(|e| AugurError::Http(e.to_string()))?;

        if !body.success {
            return Err(AugurError::Analyzer {
                analyzer: analyzer.to_string(),
                message: body
                    .error
                    .unwrap_or_else(|| "wizard reported failure".to_string()),
            });
        }
        Ok(body)
    }
}

/// Connection failures and timeouts mean the service is unreachable.
fn transport_error(err: reqwest::Error) -> AugurError {
    if err.is_connect() || err.is_timeout() {
        AugurError::BackendUnavailable(err.to_string())
    } else {
        AugurError::Http(err.to_string())
    }
}

fn handle_response_errors(response: &reqwest::Response, analyzer: &str) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        404 => Err(AugurError::Analyzer {
            analyzer: analyzer.to_string(),
            message: "unknown wizard".to_string(),
        }),
        503 => Err(AugurError::BackendUnavailable(
            "wizards service is unavailable".to_string(),
        )),
        code => Err(AugurError::Api {
            status: code,
            message: format!("wizards service error: {}", status),
        }),
    }
}

/// Pull findings out of a wizard result, if it carries any.
fn findings_of(result: &serde_json::Value) -> Vec<Finding> {
    result
        .get("findings")
        .cloned()
        .and_then(|f| serde_json::from_value(f).ok())
        .unwrap_or_default()
}

fn output_of(result: serde_json::Value) -> AnalyzerOutput {
    let findings = findings_of(&result);
    AnalyzerOutput::new(result).with_findings(findings)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    code: &'a str,
    file_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_context")]
    context: &'a AnalysisContext,
}

#[derive(Serialize)]
struct MultiRequest<'a> {
    wizards: &'a [String],
    code: &'a str,
    file_path: &'a str,
    scenario: &'a str,
    #[serde(skip_serializing_if = "is_empty_context")]
    context: &'a AnalysisContext,
}

fn is_empty_context(context: &&AnalysisContext) -> bool {
    context.is_empty()
}

#[derive(Deserialize)]
struct WizardResponse {
    success: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    /// Per-wizard results of a multi-wizard review.
    #[serde(default)]
    wizards: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct WizardListResponse {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    wizards: Vec<WizardInfo>,
}

#[derive(Deserialize)]
struct WizardInfo {
    id: String,
}

#[async_trait]
impl AnalyzerBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    async fn run_analyzer(
        &self,
        analyzer_id: &str,
        code: &str,
        file_path: &str,
        options: &AnalyzeOptions,
    ) -> Result<AnalyzerOutput> {
        self.ensure_connected()?;
        let url = self.analyze_url(analyzer_id);
        let request = AnalyzeRequest {
            code,
            file_path,
            role: options.role.as_deref(),
            task: options.task.as_deref(),
            context: &options.context,
        };

        let body = self.post(&url, &request, analyzer_id).await?;
        let result = body.result.ok_or(AugurError::EmptyResponse)?;
        Ok(output_of(result))
    }

    async fn run_multi_analyzer(
        &self,
        analyzer_ids: &[String],
        code: &str,
        file_path: &str,
        scenario: &str,
        context: &AnalysisContext,
    ) -> Result<CombinedOutput> {
        self.ensure_connected()?;
        let url = format!("{}/api/v1/wizards/multi", self.base_url);
        let request = MultiRequest {
            wizards: analyzer_ids,
            code,
            file_path,
            scenario,
            context,
        };

        let body = self.post(&url, &request, "multi").await?;
        if body.result.is_none() && body.wizards.is_empty() {
            return Err(AugurError::EmptyResponse);
        }
        Ok(CombinedOutput {
            payload: body.result.unwrap_or_default(),
            analyzers: body
                .wizards
                .into_iter()
                .map(|(id, result)| (id, output_of(result)))
                .collect(),
        })
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.http.get(&url).send().await.map_err(transport_error)?;
        handle_response_errors(&response, "health")?;

        let body: HealthResponse = response
            .json()
            .await
            .map_err(|e| AugurError::Http(e.to_string()))?;
        Ok(BackendHealth {
            status: body.status,
            version: body.version,
        })
    }

    async fn start(&self) -> Result<InitResult> {
        let url = format!("{}/api/v1/wizards", self.base_url);
        debug!(url = %url, "connecting to wizards service");
        let response = self.http.get(&url).send().await.map_err(transport_error)?;
        handle_response_errors(&response, "wizards")?;

        let body: WizardListResponse = response
            .json()
            .await
            .map_err(|e| AugurError::Http(e.to_string()))?;

        self.connected.store(true, Ordering::Release);
        info!(
            endpoint = %self.base_url,
            wizards = body.wizards.len(),
            "connected to wizards service"
        );
        Ok(InitResult {
            version: body.version,
            capabilities: body.wizards.into_iter().map(|w| w.id).collect(),
        })
    }

    async fn stop(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = HttpBackend::with_base_url("http://localhost:8000/").unwrap();
        assert_eq!(backend.endpoint().as_deref(), Some("http://localhost:8000"));
    }

    #[test]
    fn routes_override_default_action() {
        let backend = HttpBackend::with_base_url("http://svc")
            .unwrap()
            .with_route("security", "/security/scan-snippet/")
            .with_route("code-review", "code-review/review");
        assert_eq!(
            backend.analyze_url("security"),
            "http://svc/api/v1/wizards/security/scan-snippet"
        );
        assert_eq!(
            backend.analyze_url("code-review"),
            "http://svc/api/v1/wizards/code-review/review"
        );
        assert_eq!(
            backend.analyze_url("performance"),
            "http://svc/api/v1/wizards/performance/analyze"
        );
    }

    #[test]
    fn findings_are_extracted_when_present() {
        let output = output_of(serde_json::json!({
            "summary": "ok",
            "findings": [{ "severity": "warning", "message": "slow loop", "line": 4 }]
        }));
        assert_eq!(output.findings.len(), 1);
        assert_eq!(output.findings[0].severity, Severity::Warning);
        assert_eq!(output.findings[0].line, Some(4));
    }

    #[test]
    fn malformed_findings_are_ignored() {
        let output = output_of(serde_json::json!({ "findings": "none" }));
        assert!(output.findings.is_empty());
        assert_eq!(output.payload["findings"], "none");
    }

    #[tokio::test]
    async fn calls_before_start_are_unavailable() {
        let backend = HttpBackend::with_base_url("http://127.0.0.1:9").unwrap();
        let err = backend
            .run_analyzer("security", "x", "a.py", &AnalyzeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AugurError::BackendUnavailable(_)));
    }
}

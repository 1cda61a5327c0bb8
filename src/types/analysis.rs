//! Analysis request and result types

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One issue reported by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line: None,
            rule: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

/// Free-form context forwarded to the backend with a request.
pub type AnalysisContext = BTreeMap<String, serde_json::Value>;

/// Options for a single-analyzer request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: AnalysisContext,
}

impl AnalyzeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// What a backend returns for one analyzer run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerOutput {
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl AnalyzerOutput {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            findings: Vec::new(),
        }
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }
}

/// What a backend returns for a collaborative multi-analyzer run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedOutput {
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Per-analyzer outputs, keyed by analyzer id.
    #[serde(default)]
    pub analyzers: BTreeMap<String, AnalyzerOutput>,
}

/// Latest known result for one `(file_path, analyzer_id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: String,
    pub analyzer_id: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub findings: Vec<Finding>,
    pub timestamp: SystemTime,
}

impl AnalysisResult {
    pub fn from_output(
        file_path: impl Into<String>,
        analyzer_id: impl Into<String>,
        output: AnalyzerOutput,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            analyzer_id: analyzer_id.into(),
            payload: output.payload,
            findings: output.findings,
            timestamp: SystemTime::now(),
        }
    }

    /// Number of findings with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

/// Result of a joint multi-analyzer review, cached as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub file_path: String,
    /// Sorted, de-duplicated analyzer ids.
    pub analyzer_ids: Vec<String>,
    pub scenario: String,
    pub payload: serde_json::Value,
    pub results: Vec<AnalysisResult>,
    pub timestamp: SystemTime,
}

/// A cached analysis: either a single-analyzer result or a joint review.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedAnalysis {
    Single(AnalysisResult),
    Combined(CombinedResult),
}

/// One analyzer that failed inside a batch. Failures never abort siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerFailure {
    pub file_path: String,
    pub analyzer_id: String,
    pub reason: String,
}

/// Aggregate of a concurrent fan-out: "N of M succeeded" as a value.
///
/// `results` order follows completion order, not submission order; match
/// entries by `analyzer_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<AnalyzerFailure>,
}

impl BatchOutcome {
    /// Number of analyzers dispatched.
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Find the result for an analyzer.
    pub fn result(&self, analyzer_id: &str) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| r.analyzer_id == analyzer_id)
    }
}

/// Aggregate counts over the results index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub total_analyses: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub by_analyzer: BTreeMap<String, usize>,
}

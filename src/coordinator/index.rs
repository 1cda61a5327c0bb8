//! Latest-result-per-(file, analyzer) store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{AnalysisResult, AnalysisStatistics, Severity};

/// The coordinator's results index.
///
/// Holds only the most recent result for each `(file_path, analyzer_id)`
/// pair; recording a newer result replaces the old one. Guarded by one
/// index-wide lock, like [`ResultCache`](crate::ResultCache), and entirely
/// independent of it.
#[derive(Default)]
pub struct ResultsIndex {
    entries: RwLock<HashMap<(String, String), AnalysisResult>>,
}

impl ResultsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result`, replacing any earlier result for the same pair.
    pub fn record(&self, result: AnalysisResult) {
        let key = (result.file_path.clone(), result.analyzer_id.clone());
        self.entries.write().insert(key, result);
    }

    pub fn get(&self, file_path: &str, analyzer_id: &str) -> Option<AnalysisResult> {
        self.entries
            .read()
            .get(&(file_path.to_string(), analyzer_id.to_string()))
            .cloned()
    }

    /// Results for one file, sorted by analyzer id.
    pub fn for_file(&self, file_path: &str) -> Vec<AnalysisResult> {
        let mut results: Vec<AnalysisResult> = self
            .entries
            .read()
            .values()
            .filter(|r| r.file_path == file_path)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.analyzer_id.cmp(&b.analyzer_id));
        results
    }

    /// Every result, sorted by file path then analyzer id.
    pub fn all(&self) -> Vec<AnalysisResult> {
        let mut results: Vec<AnalysisResult> = self.entries.read().values().cloned().collect();
        results.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then_with(|| a.analyzer_id.cmp(&b.analyzer_id))
        });
        results
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop every result for one file. Returns how many were removed.
    pub fn clear_file(&self, file_path: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(path, _), _| path != file_path);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts derived by scanning the index.
    pub fn statistics(&self) -> AnalysisStatistics {
        let entries = self.entries.read();
        let mut stats = AnalysisStatistics {
            total_analyses: entries.len(),
            ..Default::default()
        };
        for result in entries.values() {
            stats.error_count += result.count(Severity::Error);
            stats.warning_count += result.count(Severity::Warning);
            stats.info_count += result.count(Severity::Info);
            *stats
                .by_analyzer
                .entry(result.analyzer_id.clone())
                .or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalyzerOutput, Finding};

    fn result(file: &str, analyzer: &str, findings: Vec<Finding>) -> AnalysisResult {
        AnalysisResult::from_output(
            file,
            analyzer,
            AnalyzerOutput::new(serde_json::json!({ "analyzer": analyzer }))
                .with_findings(findings),
        )
    }

    #[test]
    fn newer_result_replaces_older() {
        let index = ResultsIndex::new();
        index.record(result("a.rs", "security", vec![Finding::error("one")]));
        index.record(result("a.rs", "security", vec![]));
        assert_eq!(index.len(), 1);
        assert!(index.get("a.rs", "security").unwrap().findings.is_empty());
    }

    #[test]
    fn clear_file_only_touches_that_file() {
        let index = ResultsIndex::new();
        index.record(result("a.rs", "security", vec![]));
        index.record(result("a.rs", "performance", vec![]));
        index.record(result("b.rs", "security", vec![]));
        assert_eq!(index.clear_file("a.rs"), 2);
        assert_eq!(index.len(), 1);
        assert!(index.get("b.rs", "security").is_some());
    }

    #[test]
    fn for_file_is_sorted_by_analyzer() {
        let index = ResultsIndex::new();
        index.record(result("a.rs", "testing", vec![]));
        index.record(result("a.rs", "performance", vec![]));
        let ids: Vec<_> = index
            .for_file("a.rs")
            .into_iter()
            .map(|r| r.analyzer_id)
            .collect();
        assert_eq!(ids, vec!["performance", "testing"]);
    }

    #[test]
    fn statistics_count_findings_by_severity() {
        let index = ResultsIndex::new();
        index.record(result(
            "a.rs",
            "security",
            vec![Finding::error("e"), Finding::warning("w"), Finding::info("i")],
        ));
        index.record(result(
            "b.rs",
            "security",
            vec![Finding::warning("w"), Finding::warning("w2")],
        ));
        index.record(result("b.rs", "performance", vec![Finding::info("i")]));

        let stats = index.statistics();
        assert_eq!(stats.total_analyses, 3);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.warning_count, 3);
        assert_eq!(stats.info_count, 2);
        assert_eq!(stats.by_analyzer.get("security"), Some(&2));
        assert_eq!(stats.by_analyzer.get("performance"), Some(&1));
    }
}

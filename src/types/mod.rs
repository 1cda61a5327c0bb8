//! Public types for the Augur API.

mod analysis;
mod analyzer;
mod file;
mod health;

pub use analysis::{
    AnalysisContext, AnalysisResult, AnalysisStatistics, AnalyzeOptions, AnalyzerFailure,
    AnalyzerOutput, BatchOutcome, CachedAnalysis, CombinedOutput, CombinedResult, Finding,
    Severity,
};
pub use analyzer::AnalyzerDescriptor;
pub use file::{FileHandle, SourceFile, hash_content, language_for_path};
pub use health::{
    BackendHealth, ConfigurationSummary, ERROR_STATUS, HEALTHY_STATUS, HealthStatus, InitResult,
    NOT_RUNNING_STATUS,
};

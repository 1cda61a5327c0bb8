//! Analyzer registry: in-memory analyzer descriptors with layered merge.
//!
//! [`StaticAnalyzerRegistry`] holds [`AnalyzerDescriptor`] entries from:
//! 1. **Built-in defaults** - the standard wizard set, see [`default_analyzers`]
//! 2. **Configuration** - `[[analyzers.custom]]` tables
//!
//! Merge priority: later data overrides earlier (config > defaults).

use std::collections::BTreeMap;

use crate::config::AnalyzerSettings;
use crate::traits::AnalyzerRegistry;
use crate::types::AnalyzerDescriptor;

/// Languages the static-analysis wizards understand.
const CODE_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "kotlin",
    "go",
    "rust",
    "c",
    "cpp",
    "csharp",
    "ruby",
    "php",
    "swift",
];

/// Languages the test wizard can generate tests for.
const TESTABLE_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "kotlin",
    "go",
    "rust",
];

/// The built-in wizard set.
pub fn default_analyzers() -> Vec<AnalyzerDescriptor> {
    vec![
        AnalyzerDescriptor::new("security", "Security Analysis")
            .languages(CODE_LANGUAGES.iter().copied()),
        AnalyzerDescriptor::new("performance", "Performance Profiling")
            .languages(CODE_LANGUAGES.iter().copied()),
        AnalyzerDescriptor::new("testing", "Test Coverage")
            .languages(TESTABLE_LANGUAGES.iter().copied()),
        AnalyzerDescriptor::new("debugging", "Debugging Assistant")
            .languages(CODE_LANGUAGES.iter().copied()),
        // Documentation and review apply to anything, markup included.
        AnalyzerDescriptor::new("documentation", "Documentation Review"),
        AnalyzerDescriptor::new("code-review", "Code Review"),
    ]
}

/// Read-only analyzer lookup backed by an in-memory map.
///
/// Mutation (`insert`, `merge`) happens while building the registry; once it
/// is shared behind an `Arc`, it is only read.
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzerRegistry {
    entries: BTreeMap<String, AnalyzerDescriptor>,
}

impl StaticAnalyzerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding exactly `descriptors`. Later duplicates win.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = AnalyzerDescriptor>) -> Self {
        let mut registry = Self::new();
        registry.merge_batch(descriptors);
        registry
    }

    /// Registry holding the built-in wizard set.
    pub fn with_defaults() -> Self {
        Self::from_descriptors(default_analyzers())
    }

    /// Built-in wizards overlaid with configured custom analyzers.
    pub fn from_config(settings: &AnalyzerSettings) -> Self {
        let mut registry = Self::with_defaults();
        registry.merge_batch(settings.custom.iter().cloned());
        registry
    }

    /// Insert a descriptor, replacing any existing entry with the same id.
    pub fn insert(&mut self, descriptor: AnalyzerDescriptor) {
        self.entries.insert(descriptor.id.clone(), descriptor);
    }

    /// Merge a single entry.
    ///
    /// An existing entry keeps its languages when `incoming` lists none;
    /// name and enabled flag are always taken from `incoming`.
    pub fn merge(&mut self, incoming: AnalyzerDescriptor) {
        match self.entries.get_mut(&incoming.id) {
            Some(existing) => {
                existing.name = incoming.name;
                existing.enabled = incoming.enabled;
                if !incoming.languages.is_empty() {
                    existing.languages = incoming.languages;
                }
            }
            None => self.insert(incoming),
        }
    }

    /// Merge a batch of entries.
    pub fn merge_batch(&mut self, batch: impl IntoIterator<Item = AnalyzerDescriptor>) {
        for descriptor in batch {
            self.merge(descriptor);
        }
    }

    pub fn get(&self, id: &str) -> Option<&AnalyzerDescriptor> {
        self.entries.get(id)
    }

    /// All descriptors, sorted by id.
    pub fn list(&self) -> Vec<&AnalyzerDescriptor> {
        self.entries.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnalyzerRegistry for StaticAnalyzerRegistry {
    fn analyzers_for_language(&self, language: &str) -> Vec<AnalyzerDescriptor> {
        self.entries
            .values()
            .filter(|d| d.supports(language))
            .cloned()
            .collect()
    }

    fn enabled_analyzers(&self) -> Vec<AnalyzerDescriptor> {
        self.entries.values().filter(|d| d.enabled).cloned().collect()
    }

    fn analyzer_count(&self) -> usize {
        self.entries.len()
    }
}

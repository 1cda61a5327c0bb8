//! Source file handles and content hashing

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A project file discovered by a [`ProjectFileEnumerator`](crate::ProjectFileEnumerator),
/// not yet read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle {
    pub path: PathBuf,
    pub language: String,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
        }
    }

    /// Build a handle with the language inferred from the file extension.
    ///
    /// Returns `None` for files without a recognised extension.
    pub fn detect(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let language = language_for_path(&path)?;
        Some(Self {
            path,
            language: language.to_string(),
        })
    }

    /// Final path component, used in progress reports.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// A source file with its current text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as used in cache keys and the results index.
    pub path: String,
    pub language: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            content: content.into(),
        }
    }

    /// BLAKE3 hex digest of the file text.
    pub fn content_hash(&self) -> String {
        hash_content(&self.content)
    }
}

/// Computes the BLAKE3 hex digest of `content`.
pub fn hash_content(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Extension → language table. Lowercase extensions only.
const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("pyi", "python"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("go", "go"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("swift", "swift"),
    ("rb", "ruby"),
    ("php", "php"),
    ("scala", "scala"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("sql", "sql"),
];

/// Infer a language identifier from a path's extension.
pub fn language_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, language)| *language)
}

//! Fetched repository files and the filter/prioritizer that runs before summarization.

use std::path::Path;

/// Extensions processed ahead of everything else when a run is cut short.
pub const HIGH_VALUE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "mjs", "go", "java", "kt", "c", "h", "cc", "cpp", "hpp",
    "cs", "rb", "php", "swift", "scala", "sql", "sh", "vue", "svelte",
];

/// A file as returned by the repository host. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: String,
    pub content: String,
}

impl SourceDocument {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.path).extension().and_then(|e| e.to_str())
    }

    #[must_use]
    pub fn is_high_value(&self) -> bool {
        self.extension().is_some_and(|ext| {
            HIGH_VALUE_EXTENSIONS
                .iter()
                .any(|hv| hv.eq_ignore_ascii_case(ext))
        })
    }

    fn is_valid(&self) -> bool {
        // Loader error entries surface as paths like "src/x.ts (404)".
        !self.content.trim().is_empty() && !self.path.ends_with(')')
    }
}

/// Drop empty or synthetic documents, then stable-partition the rest so that
/// high-value source files come first.
///
/// Relative order within each class is preserved.
#[must_use]
pub fn filter_and_prioritize(docs: Vec<SourceDocument>) -> Vec<SourceDocument> {
    let (high, rest): (Vec<_>, Vec<_>) = docs
        .into_iter()
        .filter(SourceDocument::is_valid)
        .partition(SourceDocument::is_high_value);

    let mut out = high;
    out.extend(rest);
    out
}

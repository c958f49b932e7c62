//! Document identity and type detection.
//!
//! [`DocumentKey`] identifies a document across the cache and the coordinator,
//! [`DocumentType`] decides which parser a document goes through.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a document, the canonical path of its source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey(PathBuf);

impl DocumentKey {
    /// Creates a key from `path` as is.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Creates a key from the canonical form of `path`.
    ///
    /// Falls back to the given path when it can not be canonicalized, e.g.
    /// the file does not exist yet.
    pub fn canonical(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Type of the document, [`DocumentType::Markdown`] for unknown extensions.
    pub fn document_type(&self) -> DocumentType {
        DocumentType::from_path(&self.0).unwrap_or(DocumentType::Markdown)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for DocumentKey {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for DocumentKey {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Markdown documents (.md, .markdown, etc.)
    Markdown,
    /// Comma separated values, the delimiter is inferred from the content.
    Csv,
    /// Tab separated values.
    Tsv,
}

impl DocumentType {
    /// All supported document types.
    pub const ALL: &'static [DocumentType] = &[Self::Markdown, Self::Csv, Self::Tsv];

    /// Detect document type from file extension (case-insensitive).
    ///
    /// Returns `None` for unknown extensions or empty input.
    ///
    /// # Examples
    ///
    /// ```
    /// use docview_core::DocumentType;
    ///
    /// assert_eq!(DocumentType::from_extension("md"), Some(DocumentType::Markdown));
    /// assert_eq!(DocumentType::from_extension("CSV"), Some(DocumentType::Csv));
    /// assert_eq!(DocumentType::from_extension("tsv"), Some(DocumentType::Tsv));
    /// assert_eq!(DocumentType::from_extension("pdf"), None);
    /// assert_eq!(DocumentType::from_extension(""), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.is_empty() {
            return None;
        }
        let ext_lower = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|doc_type| doc_type.extensions().contains(&ext_lower.as_str()))
            .copied()
    }

    /// Detect document type from file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Lowercase file extensions of this document type.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Markdown => &["md", "markdown", "mdown", "mkdn", "mkd"],
            Self::Csv => &["csv"],
            Self::Tsv => &["tsv", "tab"],
        }
    }
}

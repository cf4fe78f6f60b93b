//! Documents flowing through the compilation pipeline.

use std::io;
use std::sync::Arc;

use super::engine::RazorError;
use crate::project::ProjectItem;

/// Template or import source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Logical path, `None` for synthesized sources such as the default imports.
    file_path: Option<String>,
    content: Arc<str>,
}

impl SourceDocument {
    pub fn new(file_path: Option<String>, content: impl Into<Arc<str>>) -> Self {
        Self {
            file_path,
            content: content.into(),
        }
    }

    /// Read an existing item.
    pub fn from_item(item: &ProjectItem) -> io::Result<Self> {
        let content = item.read_to_string()?;
        Ok(Self::new(Some(item.path().to_string()), content))
    }

    #[inline]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Template source plus its import sources, ready for the template engine.
#[derive(Debug, Clone)]
pub struct CodeDocument {
    pub source: SourceDocument,
    /// Global defaults first, then import files root-most first.
    pub imports: Vec<SourceDocument>,
    /// Logical path of the template, used as the default diagnostic file.
    pub relative_path: String,
}

impl CodeDocument {
    pub fn new(source: SourceDocument, imports: Vec<SourceDocument>, relative_path: impl Into<String>) -> Self {
        Self {
            source,
            imports,
            relative_path: relative_path.into(),
        }
    }
}

/// Template engine output.
#[derive(Debug, Clone, Default)]
pub struct GeneratedDocument {
    pub generated_code: String,
    pub diagnostics: Vec<RazorError>,
}

impl GeneratedDocument {
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

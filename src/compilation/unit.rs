//! A template together with the import files that apply to it.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::document::{CodeDocument, SourceDocument};
use super::options::{ImportsKind, default_imports};
use crate::project::{ProjectItem, RazorProject};

/// A template or import that exists but could not be read.
#[derive(Debug, Error)]
#[error("failed to read {path}: {source}")]
pub struct ReadError {
    pub path: String,
    #[source]
    pub source: io::Error,
}

/// Template item, its hierarchical imports and the global imports.
///
/// Imports are root-most first and include items that do not exist, so
/// that creating one of them invalidates the compiled template.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    item: ProjectItem,
    imports: Vec<ProjectItem>,
    global_imports: Arc<SourceDocument>,
}

impl CompilationUnit {
    pub fn new(item: ProjectItem, imports: Vec<ProjectItem>) -> Self {
        Self {
            item,
            imports,
            global_imports: default_imports(),
        }
    }

    pub fn with_global_imports(mut self, global_imports: Arc<SourceDocument>) -> Self {
        self.global_imports = global_imports;
        self
    }

    /// Resolve `path` and its import chain through `project`.
    pub fn resolve(project: &dyn RazorProject, path: &str, import_file_name: &str) -> Self {
        let item = project.get_item(path);
        let imports = project.find_hierarchical_items(item.path(), import_file_name);
        Self::new(item, imports)
    }

    #[inline]
    pub fn item(&self) -> &ProjectItem {
        &self.item
    }

    #[inline]
    pub fn imports(&self) -> &[ProjectItem] {
        &self.imports
    }

    #[inline]
    pub fn global_imports(&self) -> &Arc<SourceDocument> {
        &self.global_imports
    }

    /// Paths whose change invalidates this unit: the template, then every
    /// import candidate.
    pub fn watched_paths(&self) -> Vec<&str> {
        std::iter::once(self.item.path())
            .chain(self.imports.iter().map(ProjectItem::path))
            .collect()
    }

    /// Import sources in application order: global defaults, then the
    /// existing import files root-most first.
    pub fn import_chain(&self) -> Result<Vec<SourceDocument>, ReadError> {
        let mut chain = Vec::with_capacity(self.imports.len() + 1);
        chain.push(SourceDocument::clone(&self.global_imports));

        for import in self.imports.iter().filter(|i| i.exists()) {
            chain.push(read_source(import)?);
        }
        Ok(chain)
    }

    /// Read the template and its imports.
    pub fn create_code_document(&self) -> Result<CodeDocument, ReadError> {
        let source = read_source(&self.item)?;
        let imports = self.import_chain()?;
        Ok(CodeDocument::new(source, imports, self.item.path()))
    }
}

fn read_source(item: &ProjectItem) -> Result<SourceDocument, ReadError> {
    SourceDocument::from_item(item).map_err(|source| ReadError {
        path: item.path().to_string(),
        source,
    })
}

/// Resolve a unit using the import file for `kind`.
pub fn resolve_unit(
    project: &dyn RazorProject,
    path: &str,
    kind: ImportsKind,
    options: &super::CompilationOptions,
) -> CompilationUnit {
    CompilationUnit::resolve(project, path, options.import_file_name(kind))
        .with_global_imports(options.global_imports.clone())
}

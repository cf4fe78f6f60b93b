//! Compilation options and the global default imports.

use std::sync::{Arc, LazyLock};

use super::document::SourceDocument;

/// Import file applied to views.
pub const VIEW_IMPORTS_FILE_NAME: &str = "_ViewImports.cshtml";

/// Import file applied to pages.
pub const PAGE_IMPORTS_FILE_NAME: &str = "_PageImports.cshtml";

/// Which import chain a template uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportsKind {
    Views,
    Pages,
}

const DEFAULT_IMPORT_LINES: &[&str] = &[
    "@using System",
    "@using System.Linq",
    "@using System.Collections.Generic",
    "@using Microsoft.AspNetCore.Mvc",
    "@using Microsoft.AspNetCore.Mvc.Rendering",
    "@using Microsoft.AspNetCore.Mvc.ViewFeatures",
    "@inject Microsoft.AspNetCore.Mvc.Rendering.IHtmlHelper<TModel> Html",
    "@inject Microsoft.AspNetCore.Mvc.Rendering.IJsonHelper Json",
    "@inject Microsoft.AspNetCore.Mvc.IViewComponentHelper Component",
    "@inject Microsoft.AspNetCore.Mvc.IUrlHelper Url",
    "@inject Microsoft.AspNetCore.Mvc.ViewFeatures.IModelExpressionProvider ModelExpressionProvider",
    "@addTagHelper Microsoft.AspNetCore.Mvc.Razor.TagHelpers.UrlResolutionTagHelper, Microsoft.AspNetCore.Mvc.Razor",
];

/// Imports every template receives ahead of its import files.
///
/// Built once and never mutated.
pub static DEFAULT_IMPORTS: LazyLock<Arc<SourceDocument>> =
    LazyLock::new(|| imports_document(DEFAULT_IMPORT_LINES));

/// Shared handle to [`DEFAULT_IMPORTS`].
#[inline]
pub fn default_imports() -> Arc<SourceDocument> {
    Arc::clone(&DEFAULT_IMPORTS)
}

/// Build an import document from directive lines.
pub fn imports_document<S: AsRef<str>>(lines: &[S]) -> Arc<SourceDocument> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    Arc::new(SourceDocument::new(None, content))
}

/// Knobs for the compilation pipeline.
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    pub view_imports: String,
    pub page_imports: String,
    /// Namespaces the backend resolves `@using` directives against.
    /// Empty accepts any namespace.
    pub references: Vec<String>,
    pub global_imports: Arc<SourceDocument>,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            view_imports: VIEW_IMPORTS_FILE_NAME.to_string(),
            page_imports: PAGE_IMPORTS_FILE_NAME.to_string(),
            references: Vec::new(),
            global_imports: default_imports(),
        }
    }
}

impl CompilationOptions {
    pub fn import_file_name(&self, kind: ImportsKind) -> &str {
        match kind {
            ImportsKind::Views => &self.view_imports,
            ImportsKind::Pages => &self.page_imports,
        }
    }
}

//! Compilation pipeline.
//!
//! ```text
//! CompilationUnit ──create_code_document──▶ CodeDocument
//!     ──TemplateEngine──▶ GeneratedDocument ──CompilerBackend──▶ CompiledType
//! ```
//!
//! Template-engine diagnostics short-circuit before the backend runs.
//! Every failure is reported as a [`CompilationResult::Failure`] built by
//! the [`diagnostics`] formatter.

pub mod builtin;
pub mod diagnostics;
mod document;
mod engine;
mod options;
mod pipeline;
mod result;
mod unit;

pub use document::{CodeDocument, GeneratedDocument, SourceDocument};
pub use engine::{BackendDiagnostic, CompilerBackend, RazorError, SourceLocation, TemplateEngine};
pub use options::{
    CompilationOptions, DEFAULT_IMPORTS, ImportsKind, PAGE_IMPORTS_FILE_NAME,
    VIEW_IMPORTS_FILE_NAME, default_imports, imports_document,
};
pub use pipeline::CompilationPipeline;
pub use result::{CompilationFailure, CompilationResult, CompiledType, DiagnosticMessage};
pub use unit::{CompilationUnit, ReadError, resolve_unit};

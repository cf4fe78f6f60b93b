//! Seams to the template engine and the compiler backend.

use std::fmt;

use super::document::{CodeDocument, GeneratedDocument};
use super::result::CompiledType;

/// Zero-based position inside a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    /// `None` means the template being compiled.
    pub file_path: Option<String>,
    pub absolute_index: usize,
    pub line_index: usize,
    pub character_index: usize,
}

impl SourceLocation {
    pub fn new(
        file_path: Option<String>,
        absolute_index: usize,
        line_index: usize,
        character_index: usize,
    ) -> Self {
        Self {
            file_path,
            absolute_index,
            line_index,
            character_index,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{},{})",
            self.absolute_index, self.line_index, self.character_index
        )
    }
}

/// Parser or generator error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RazorError {
    pub message: String,
    pub location: SourceLocation,
    pub length: usize,
}

impl RazorError {
    pub fn new(message: impl Into<String>, location: SourceLocation, length: usize) -> Self {
        Self {
            message: message.into(),
            location,
            length,
        }
    }
}

impl fmt::Display for RazorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error @ {}({}) - [{}]",
            self.location, self.length, self.message
        )
    }
}

impl std::error::Error for RazorError {}

/// Compiler diagnostic with 1-based positions mapped back to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDiagnostic {
    pub id: Option<String>,
    pub message: String,
    /// `None` when the diagnostic has no mapped location.
    pub file_path: Option<String>,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl BackendDiagnostic {
    /// Diagnostic spanning a single point.
    pub fn at(message: impl Into<String>, file_path: Option<String>, line: usize, column: usize) -> Self {
        Self {
            id: None,
            message: message.into(),
            file_path,
            line,
            column,
            end_line: line,
            end_column: column,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = end_line;
        self.end_column = end_column;
        self
    }
}

/// Parses a template and its imports and generates code.
pub trait TemplateEngine: Send + Sync {
    fn generate(&self, document: &CodeDocument) -> GeneratedDocument;
}

/// Compiles generated code into an activatable page type.
pub trait CompilerBackend: Send + Sync {
    fn compile(
        &self,
        generated: &GeneratedDocument,
        references: &[String],
    ) -> Result<CompiledType, Vec<BackendDiagnostic>>;
}
